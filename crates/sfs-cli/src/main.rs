use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use sfs_core::{probe_geometry, FileDevice, FileSystem, FsError};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the disk image
    #[arg(short, long)]
    image: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files with their sizes
    Ls,

    /// Print a file to stdout
    Cat { name: String },

    /// Copy a host file into the image, replacing any file of the same name
    Put {
        file: PathBuf,

        /// Name inside the image; defaults to the host file name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Copy a file out of the image
    Get {
        name: String,

        /// Destination on the host; defaults to the file name
        dest: Option<PathBuf>,
    },

    /// Delete a file
    Rm { name: String },

    /// Show a file's inode and block usage
    Stat { name: String },

    /// Show the image geometry and free space
    Info,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut fs = mount(&cli.image)?;

    match cli.command {
        Commands::Ls => {
            for name in fs.files() {
                println!("{:>10}  {}", fs.file_size(&name)?, name);
            }
        }
        Commands::Cat { name } => {
            let data = read_file(&mut fs, &name)?;
            std::io::stdout().write_all(&data)?;
        }
        Commands::Put { file, name } => {
            let name = match name {
                Some(name) => name,
                None => host_name(&file)?,
            };
            let data =
                std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            match fs.remove(&name) {
                Ok(()) => info!("Replacing {}", name),
                Err(FsError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
            let h = fs.open(&name)?;
            let written = fs.write(h, &data)?;
            fs.close(h)?;
            if written < data.len() {
                bail!("{name}: only {written} of {} bytes fit", data.len());
            }
            println!("{name}: wrote {written} bytes");
        }
        Commands::Get { name, dest } => {
            let data = read_file(&mut fs, &name)?;
            let dest = dest.unwrap_or_else(|| PathBuf::from(&name));
            std::fs::write(&dest, &data)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
        }
        Commands::Rm { name } => fs.remove(&name)?,
        Commands::Stat { name } => {
            let stat = fs.stat(&name)?;
            println!("name:     {name}");
            println!("inode:    {}", stat.inode);
            println!("size:     {}", stat.size);
            println!("blocks:   {}", stat.blocks);
            println!("indirect: {}", if stat.indirect { "yes" } else { "no" });
        }
        Commands::Info => {
            let geometry = *fs.geometry();
            let layout = *fs.layout();
            println!("block size:  {}", geometry.block_size);
            println!("blocks:      {}", geometry.block_count);
            println!("inodes:      {}", geometry.inode_count);
            println!("files:       {}", fs.files().len());
            println!(
                "data blocks: {} free of {} ({}..{})",
                fs.free_blocks(),
                layout.data.len,
                layout.data.start,
                layout.data.end()
            );
            println!("max file:    {} bytes", geometry.max_file_size());
        }
    }

    fs.into_device().sync()?;
    Ok(())
}

fn mount(path: &Path) -> Result<FileSystem<FileDevice>> {
    let geometry = probe_geometry(path)
        .with_context(|| format!("{} is not an SFS image", path.display()))?;
    let device = FileDevice::open(path, geometry.block_size, geometry.block_count)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    FileSystem::mount(device, geometry)
        .with_context(|| format!("Failed to mount {}", path.display()))
}

/// Whole contents of an existing file.
fn read_file(fs: &mut FileSystem<FileDevice>, name: &str) -> Result<Vec<u8>> {
    let size = fs.file_size(name)? as usize;
    let h = fs.open(name)?;
    if size > 0 {
        fs.seek(h, 0)?;
    }
    let mut data = vec![0u8; size];
    let read = fs.read(h, &mut data)?;
    fs.close(h)?;
    data.truncate(read);
    Ok(data)
}

fn host_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no usable file name", path.display()))
}
