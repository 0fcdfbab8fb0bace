use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::debug;
use sfs_core::{FileDevice, FileSystem, Geometry, Layout};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the disk image
    #[arg(short, long)]
    image: PathBuf,

    /// Block size in bytes
    #[arg(long, default_value_t = Geometry::default().block_size)]
    block_size: u32,

    /// Number of blocks on the device
    #[arg(short, long, default_value_t = Geometry::default().block_count)]
    blocks: u32,

    /// Number of inodes
    #[arg(short, long, default_value_t = Geometry::default().inode_count)]
    inodes: u32,

    /// Overwrite an existing image
    #[arg(short, long)]
    force: bool,

    /// Host files to copy into the new file system
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let geometry = Geometry::new(cli.block_size, cli.blocks, cli.inodes);
    let layout = Layout::compute(&geometry).context("Invalid geometry")?;

    if cli.image.exists() && !cli.force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            cli.image.display()
        );
    }

    println!(
        "Formatting {} ({} bytes, {} blocks of {} bytes)...",
        cli.image.display(),
        geometry.device_bytes(),
        geometry.block_count,
        geometry.block_size
    );
    println!(
        "  inode table {:>5}..{:<5} ({} inodes)",
        layout.inode_table.start,
        layout.inode_table.end(),
        geometry.inode_count
    );
    println!(
        "  directory   {:>5}..{:<5} ({} entries)",
        layout.directory.start,
        layout.directory.end(),
        geometry.directory_capacity()
    );
    println!(
        "  data        {:>5}..{:<5} (files up to {} bytes)",
        layout.data.start,
        layout.data.end(),
        geometry.max_file_size()
    );
    println!(
        "  bitmap      {:>5}..{:<5}",
        layout.bitmap.start,
        layout.bitmap.end()
    );

    let device = FileDevice::create(&cli.image, geometry.block_size, geometry.block_count)
        .with_context(|| format!("Failed to create {}", cli.image.display()))?;
    let mut fs = FileSystem::format(device, geometry)?;

    for path in &cli.files {
        import(&mut fs, path)?;
    }

    fs.into_device().sync()?;
    println!("Format complete.");

    Ok(())
}

fn import(fs: &mut FileSystem<FileDevice>, path: &Path) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    debug!("Importing {} as {}", path.display(), name);

    let h = fs
        .open(name)
        .with_context(|| format!("Cannot create {name}"))?;
    let written = fs.write(h, &data)?;
    fs.close(h)?;

    if written < data.len() {
        bail!("{name}: only {written} of {} bytes fit", data.len());
    }
    println!("  added {name} ({written} bytes)");
    Ok(())
}
