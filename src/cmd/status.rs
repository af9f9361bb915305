use crate::config::{Config, ImageGenConfig};
use crate::images::{image_status, RestStore};
use crate::loader::truncate;

pub fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let store = RestStore::new(&config, ImageGenConfig::default().storage.bucket)?;

    println!("{}", "=".repeat(70));
    println!("{:^70}", "IMAGE GENERATION STATUS");
    println!("{}", "=".repeat(70));
    println!();

    let mut with_total = 0;
    let mut without_total = 0;

    for (entry_type, counts) in image_status(&store) {
        match counts {
            Ok(counts) => {
                if counts.total() > 0 {
                    println!("{}:", entry_type.as_str().to_uppercase());
                    println!("  Total: {}", counts.total());
                    println!(
                        "  With images: {} ({:.1}%)",
                        counts.with_image,
                        counts.percent_done()
                    );
                    println!("  Without images: {}", counts.without_image);
                    println!();
                }
                with_total += counts.with_image;
                without_total += counts.without_image;
            }
            Err(e) => {
                println!("{}: Error - {}", entry_type, truncate(&e.to_string(), 50));
                println!();
            }
        }
    }

    println!("{}", "=".repeat(70));
    println!(
        "{:^70}",
        format!("TOTAL: {} with images, {} remaining", with_total, without_total)
    );
    println!("{}", "=".repeat(70));
    Ok(())
}
