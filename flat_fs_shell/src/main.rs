use clap::{App, Arg};
use flat_fs::{FileSystem, FsError, FsResult, MemBlockDevice, BLOCK_SIZE};
use log::{warn, Level, LevelFilter, Log, Metadata, Record};
use std::sync::Arc;

/// a simple stderr logger with per-level colors
struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }
    fn log(&self, record: &Record) {
        let color = match record.level() {
            Level::Error => 31, // Red
            Level::Warn => 93,  // BrightYellow
            Level::Info => 34,  // Blue
            Level::Debug => 32, // Green
            Level::Trace => 90, // BrightBlack
        };
        eprintln!(
            "\u{1B}[{}m[{:>5}] {}\u{1B}[0m",
            color,
            record.level(),
            record.args()
        );
    }
    fn flush(&self) {}
}

fn init_logger() {
    static LOGGER: SimpleLogger = SimpleLogger;
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(match std::env::var("LOG").as_deref() {
        Ok("ERROR") => LevelFilter::Error,
        Ok("WARN") => LevelFilter::Warn,
        Ok("INFO") => LevelFilter::Info,
        Ok("DEBUG") => LevelFilter::Debug,
        Ok("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    });
}

fn main() {
    init_logger();
    let matches = App::new("flat_fs shell")
        .arg(
            Arg::with_name("size")
                .short("s")
                .long("size")
                .takes_value(true)
                .help("Device size in bytes, must be a multiple of 512"),
        )
        .arg(
            Arg::with_name("descriptors")
                .short("d")
                .long("descriptors")
                .takes_value(true)
                .help("Capacity of the file descriptor table"),
        )
        .get_matches();

    let size: usize = matches
        .value_of("size")
        .unwrap_or("10485760")
        .parse()
        .expect("--size must be an integer");
    let descriptors: usize = matches
        .value_of("descriptors")
        .unwrap_or("100")
        .parse()
        .expect("--descriptors must be an integer");

    let device = Arc::new(MemBlockDevice::new(size).expect("device size not block-aligned"));
    println!(
        "Initialized in-memory device: {} bytes ({} blocks of {})",
        size,
        size / BLOCK_SIZE,
        BLOCK_SIZE
    );
    let mut fs = FileSystem::new(device, descriptors).expect("mkfs failed");

    demo(&mut fs).expect("demo sequence failed");
}

fn separator() {
    println!("{}", "-".repeat(96));
}

/// The canned demonstration sequence: create/write/read a file, a nested
/// directory, cd in and out, a symlink created and removed, and a recursive
/// rmdir followed by a second (soft-failing) rmdir of the same path.
fn demo(fs: &mut FileSystem) -> FsResult<()> {
    separator();
    println!("Creating example_file.txt, writing, reading back, closing:");
    fs.create("example_file.txt")?;
    let handle = fs.open("example_file.txt")?;
    fs.write(handle, b"Hello, World!")?;
    fs.seek(handle, 0)?;
    let data = fs.read(handle, 13)?;
    println!("{}", String::from_utf8_lossy(&data));
    fs.close(handle)?;

    separator();
    println!("Creating dir1 with a file inside:");
    fs.mkdir("dir1")?;
    fs.create("dir1/file_dir1.txt")?;
    println!("Current directory listing: {:?}", fs.ls(None));

    separator();
    println!("Writing into dir1/file_dir1.txt:");
    let handle = fs.open("dir1/file_dir1.txt")?;
    fs.write(handle, b"nested contents")?;
    fs.close(handle)?;
    println!("stat: {:?}", fs.stat("dir1/file_dir1.txt")?);

    separator();
    println!("Changing into dir1:");
    fs.cd("dir1")?;
    println!("Current directory: {}", fs.current_dir());
    println!("Listing: {:?}", fs.ls(None));

    separator();
    println!("Back to the root directory:");
    fs.cd("/")?;
    println!("Current directory: {}", fs.current_dir());

    separator();
    println!("Creating a symlink to dir1/file_dir1.txt and reading through it:");
    fs.symlink("dir1/file_dir1.txt", "symlink_to_file")?;
    let handle = fs.open("symlink_to_file")?;
    let data = fs.read(handle, 15)?;
    println!("read via symlink: {}", String::from_utf8_lossy(&data));
    fs.close(handle)?;

    separator();
    println!("Removing the symlink, target must stay readable:");
    println!("Listing before: {:?}", fs.ls(None));
    fs.unlink("symlink_to_file")?;
    println!("Listing after: {:?}", fs.ls(None));
    let handle = fs.open("dir1/file_dir1.txt")?;
    let data = fs.read(handle, 15)?;
    println!("read target: {}", String::from_utf8_lossy(&data));
    fs.close(handle)?;

    separator();
    println!("Removing dir1 (recursive):");
    fs.rmdir("dir1")?;
    println!("Root listing after removal: {:?}", fs.ls(None));

    separator();
    println!("Removing dir1 a second time:");
    // a repeat rmdir of a missing path is a soft failure here, by contract
    match fs.rmdir("dir1") {
        Err(FsError::NotFound) => warn!("rmdir dir1: {}", FsError::NotFound),
        other => other?,
    }

    Ok(())
}
