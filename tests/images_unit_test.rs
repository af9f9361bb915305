use compendium_loader::config::ImageGenConfig;
use compendium_loader::images::{
    image_status, CompendiumStore, EntryError, EntryType, ImageBackend, ImageCounts, ImageError,
    ImagePipeline, StoreError,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Map, Value as JsonValue};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Cursor;

/// Fails the first `failures` calls, then returns `image`.
struct FlakyBackend {
    failures: Cell<u32>,
    rate_limited: bool,
    calls: Cell<u32>,
    prompts: RefCell<Vec<String>>,
    image: Vec<u8>,
}

impl FlakyBackend {
    fn new(failures: u32) -> Self {
        Self {
            failures: Cell::new(failures),
            rate_limited: false,
            calls: Cell::new(0),
            prompts: RefCell::new(Vec::new()),
            image: b"\x89PNG".to_vec(),
        }
    }
}

impl ImageBackend for FlakyBackend {
    fn generate(&self, prompt: &str, _width: u32, _height: u32) -> Result<Vec<u8>, ImageError> {
        self.calls.set(self.calls.get() + 1);
        self.prompts.borrow_mut().push(prompt.to_string());
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Err(if self.rate_limited {
                ImageError::RateLimited
            } else {
                ImageError::Api {
                    status: 500,
                    message: "upstream".into(),
                }
            });
        }
        Ok(self.image.clone())
    }
}

#[derive(Default)]
struct MemoryStore {
    rows: Vec<Map<String, JsonValue>>,
    objects: RefCell<HashMap<String, Vec<u8>>>,
    links: RefCell<HashMap<String, String>>,
    fail_uploads: bool,
}

impl MemoryStore {
    fn with_rows(rows: Vec<JsonValue>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter_map(|r| r.as_object().cloned())
                .collect(),
            ..Self::default()
        }
    }
}

impl CompendiumStore for MemoryStore {
    fn entries_without_images(
        &self,
        _table: &str,
        limit: usize,
    ) -> Result<Vec<Map<String, JsonValue>>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.get("image_url").map_or(true, JsonValue::is_null))
            .take(limit)
            .cloned()
            .collect())
    }

    fn upload_image(&self, path: &str, png: Vec<u8>) -> Result<String, StoreError> {
        if self.fail_uploads {
            return Err(StoreError::Api {
                status: 403,
                message: "bucket not found".into(),
            });
        }
        self.objects.borrow_mut().insert(path.to_string(), png);
        Ok(format!("https://cdn.test/{path}"))
    }

    fn set_image_url(&self, _table: &str, id: &str, image_url: &str) -> Result<bool, StoreError> {
        let known = self
            .rows
            .iter()
            .any(|r| r.get("id").and_then(JsonValue::as_str) == Some(id));
        if known {
            self.links
                .borrow_mut()
                .insert(id.to_string(), image_url.to_string());
        }
        Ok(known)
    }

    fn count_images(&self, _table: &str) -> Result<ImageCounts, StoreError> {
        let with_image = self
            .rows
            .iter()
            .filter(|r| r.get("image_url").is_some_and(|v| !v.is_null()))
            .count();
        Ok(ImageCounts {
            with_image,
            without_image: self.rows.len() - with_image,
        })
    }
}

/// Counts per table; tables not listed fail.
struct CountingStore {
    counts: HashMap<&'static str, ImageCounts>,
}

impl CompendiumStore for CountingStore {
    fn entries_without_images(
        &self,
        _table: &str,
        _limit: usize,
    ) -> Result<Vec<Map<String, JsonValue>>, StoreError> {
        Ok(Vec::new())
    }

    fn upload_image(&self, path: &str, _png: Vec<u8>) -> Result<String, StoreError> {
        Ok(path.to_string())
    }

    fn set_image_url(&self, _table: &str, _id: &str, _image_url: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn count_images(&self, table: &str) -> Result<ImageCounts, StoreError> {
        self.counts.get(table).copied().ok_or(StoreError::Api {
            status: 404,
            message: format!("relation {table} does not exist"),
        })
    }
}

fn quick_config() -> ImageGenConfig {
    let mut config = ImageGenConfig::default();
    config.retry.delay_seconds = 0;
    config.retry.rate_limit_seconds = 0;
    config.batch.delay_seconds = 0;
    config
}

fn monster_rows() -> Vec<JsonValue> {
    vec![
        json!({"id": "m1", "name": "Goblin Shaman", "description": "Chants over bones", "gate_rank": "E", "image_url": null}),
        json!({"id": "m2", "name": "Ice Elf", "gate_rank": "A", "tags": ["cold", "elf"]}),
        json!({"id": "m3", "name": "Kasaka", "image_url": "https://cdn.test/old.png"}),
    ]
}

#[test]
fn test_pipeline_generates_uploads_and_links() {
    let config = quick_config();
    let backend = FlakyBackend::new(0);
    let store = MemoryStore::with_rows(monster_rows());
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    let summary = pipeline.run(EntryType::Monsters, 10).unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.generated, 2);
    assert_eq!(backend.calls.get(), 2);

    let objects = store.objects.borrow();
    assert!(objects.contains_key("monsters/m1-goblin-shaman.png"));
    assert!(objects.contains_key("monsters/m2-ice-elf.png"));

    let links = store.links.borrow();
    assert_eq!(
        links.get("m1").map(String::as_str),
        Some("https://cdn.test/monsters/m1-goblin-shaman.png")
    );
    assert!(!links.contains_key("m3"));
}

#[test]
fn test_prompt_carries_entry_fields() {
    let config = quick_config();
    let backend = FlakyBackend::new(0);
    let store = MemoryStore::with_rows(monster_rows());
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    pipeline.run(EntryType::Monsters, 1).unwrap();

    let prompts = backend.prompts.borrow();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Goblin Shaman"));
    assert!(prompts[0].contains("Chants over bones"));
}

#[test]
fn test_limit_caps_entries() {
    let config = quick_config();
    let backend = FlakyBackend::new(0);
    let store = MemoryStore::with_rows(monster_rows());
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    let summary = pipeline.run(EntryType::Monsters, 1).unwrap();
    assert_eq!(summary.attempted, 1);
}

#[test]
fn test_transient_failures_are_retried() {
    let config = quick_config();
    let backend = FlakyBackend::new(2);
    let store = MemoryStore::with_rows(vec![json!({"id": "r1", "name": "Orb of Avarice"})]);
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    let summary = pipeline.run(EntryType::Relics, 5).unwrap();

    assert_eq!(summary.generated, 1);
    assert_eq!(backend.calls.get(), 3);
}

#[test]
fn test_rate_limit_is_retried() {
    let config = quick_config();
    let mut backend = FlakyBackend::new(1);
    backend.rate_limited = true;
    let store = MemoryStore::with_rows(vec![json!({"id": "j1", "name": "Necromancer"})]);
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    let summary = pipeline.run(EntryType::Jobs, 5).unwrap();

    assert_eq!(summary.generated, 1);
    assert_eq!(backend.calls.get(), 2);
}

#[test]
fn test_entry_gives_up_after_max_attempts() {
    let config = quick_config();
    let backend = FlakyBackend::new(10);
    let store = MemoryStore::with_rows(vec![json!({"id": "e1", "name": "Demon King's Dagger"})]);
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    let summary = pipeline.run(EntryType::Equipment, 5).unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.generated, 0);
    assert_eq!(backend.calls.get(), config.retry.max_attempts);
    assert!(store.links.borrow().is_empty());
}

#[test]
fn test_upload_failure_skips_entry_and_continues() {
    let config = quick_config();
    let backend = FlakyBackend::new(0);
    let mut store = MemoryStore::with_rows(monster_rows());
    store.fail_uploads = true;
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    let summary = pipeline.run(EntryType::Monsters, 10).unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.generated, 0);
    assert!(store.links.borrow().is_empty());
}

#[test]
fn test_entry_without_id_is_not_generated() {
    let config = quick_config();
    let backend = FlakyBackend::new(0);
    let store = MemoryStore::with_rows(vec![json!({"name": "Nameless"})]);
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    let entry = store.rows[0].clone();
    let result = pipeline.process_entry(&entry, EntryType::Monsters);

    assert!(matches!(result, Err(EntryError::MissingId)));
    assert_eq!(backend.calls.get(), 0);
}

#[test]
fn test_entry_errors_carry_their_cause() {
    let config = quick_config();
    let store = MemoryStore::with_rows(vec![json!({"id": "e1", "name": "Kamish Fang"})]);
    let entry = store.rows[0].clone();

    let backend = FlakyBackend::new(10);
    let pipeline = ImagePipeline::new(&backend, &store, &config);
    assert!(matches!(
        pipeline.process_entry(&entry, EntryType::Equipment),
        Err(EntryError::Generation(ImageError::Api { status: 500, .. }))
    ));

    let mut failing_store = MemoryStore::with_rows(vec![json!({"id": "e1", "name": "Kamish Fang"})]);
    failing_store.fail_uploads = true;
    let backend = FlakyBackend::new(0);
    let pipeline = ImagePipeline::new(&backend, &failing_store, &config);
    assert!(matches!(
        pipeline.process_entry(&entry, EntryType::Equipment),
        Err(EntryError::Store(StoreError::Api { status: 403, .. }))
    ));

    let unknown = json!({"id": "ghost", "name": "Ghost"}).as_object().cloned().unwrap();
    let pipeline = ImagePipeline::new(&backend, &store, &config);
    assert!(matches!(
        pipeline.process_entry(&unknown, EntryType::Equipment),
        Err(EntryError::NotUpdated(id)) if id == "ghost"
    ));
}

#[test]
fn test_uploaded_image_is_flattened_and_shrunk() {
    let config = quick_config();
    let mut backend = FlakyBackend::new(0);
    let rgba = RgbaImage::from_pixel(2304, 2304, Rgba([0, 0, 0, 0]));
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(rgba)
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();
    backend.image = png.into_inner();

    let store = MemoryStore::with_rows(vec![json!({"id": "r9", "name": "Blessed Stone"})]);
    let pipeline = ImagePipeline::new(&backend, &store, &config);
    assert_eq!(pipeline.run(EntryType::Relics, 1).unwrap().generated, 1);

    let objects = store.objects.borrow();
    let uploaded = image::load_from_memory(&objects["relics/r9-blessed-stone.png"]).unwrap();
    assert_eq!((uploaded.width(), uploaded.height()), (2048, 2048));
    assert!(!uploaded.color().has_alpha());
    assert_eq!(uploaded.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
}

#[test]
fn test_count_images_splits_rows() {
    let store = MemoryStore::with_rows(monster_rows());
    let counts = store.count_images("compendium_monsters").unwrap();
    assert_eq!(
        counts,
        ImageCounts {
            with_image: 1,
            without_image: 2
        }
    );
    assert_eq!(counts.total(), 3);
}

#[test]
fn test_image_status_reports_every_type() {
    let store = CountingStore {
        counts: HashMap::from([
            (
                "compendium_monsters",
                ImageCounts {
                    with_image: 30,
                    without_image: 10,
                },
            ),
            ("compendium_equipment", ImageCounts::default()),
            (
                "compendium_jobs",
                ImageCounts {
                    with_image: 1,
                    without_image: 0,
                },
            ),
        ]),
    };

    let status = image_status(&store);
    let types: Vec<_> = status.iter().map(|(t, _)| *t).collect();
    assert_eq!(types, EntryType::ALL.to_vec());

    let monsters = status[0].1.as_ref().unwrap();
    assert_eq!(monsters.total(), 40);
    assert!((monsters.percent_done() - 75.0).abs() < 1e-9);
    assert_eq!(status[1].1.as_ref().unwrap().total(), 0);
    assert!(status[2].1.is_err());
    assert!((status[3].1.as_ref().unwrap().percent_done() - 100.0).abs() < 1e-9);
}

#[test]
fn test_nothing_to_do() {
    let config = quick_config();
    let backend = FlakyBackend::new(0);
    let store = MemoryStore::default();
    let pipeline = ImagePipeline::new(&backend, &store, &config);

    let summary = pipeline.run(EntryType::Relics, 10).unwrap();
    assert_eq!(summary.attempted, 0);
    assert_eq!(backend.calls.get(), 0);
}
