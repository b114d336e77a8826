//! CLI commands for CIM atlas pages

use std::path::Path;

use crate::textures::CimImage;

/// Show info about a CIM file
pub fn info(path: &Path) -> anyhow::Result<()> {
    let image = CimImage::read(path)?;
    let format = image.format();

    println!("CIM Information: {}", path.display());
    println!();
    println!("Dimensions: {}x{}", image.width(), image.height());
    println!("Format: {} (code {})", format.as_str(), format.code());
    println!(
        "Pixel data: {} bytes",
        image.width() as usize * image.height() as usize * format.bytes_per_pixel()
    );

    Ok(())
}

/// Convert a CIM file to PNG
pub fn export(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let image = CimImage::read(source)?;
    image.export_png(destination)?;
    println!(
        "Exported {}x{} page to {}",
        image.width(),
        image.height(),
        destination.display()
    );
    Ok(())
}
