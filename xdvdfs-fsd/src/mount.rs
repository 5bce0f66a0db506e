use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use clap::Parser;
use widestring::U16CString;

use crate::container::Container;
use crate::error::AppError;
use crate::fsproto::XdvdfsHandler;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Mounts an XDVDFS (Xbox DVD) disc image as a read-only Windows drive.",
    long_about = None
)]
pub struct MountArgs {
    /// Path to the .iso/.xiso image to mount.
    pub iso_file: PathBuf,

    /// Drive letter (e.g. `E:`) or empty NTFS directory to mount onto.
    pub mount_path: PathBuf,

    /// Enable Dokan debug output.
    #[arg(long = "debug")]
    pub debug: bool,

    /// Open a file-manager window on the mount point once it is live.
    #[arg(long = "launch")]
    pub launch: bool,
}

impl MountArgs {
    /// Parses CLI args, first translating the original tool's `/d`, `/l`,
    /// `/h` slash-flags into the long flags `clap` expects, so both flag
    /// styles work.
    pub fn parse_args() -> Self {
        let translated = std::env::args().map(|arg| match arg.as_str() {
            "/d" => "--debug".to_string(),
            "/l" => "--launch".to_string(),
            "/h" => "--help".to_string(),
            other => other.to_string(),
        });

        Self::parse_from(translated)
    }
}

static MOUNT_POINT: OnceLock<U16CString> = OnceLock::new();
static UNMOUNT_REQUESTED: OnceLock<()> = OnceLock::new();

/// Installs a Ctrl-C handler that requests Dokan unmount the given mount
/// point. Guarded so a second Ctrl-C (or a spurious re-delivery) is a no-op
/// rather than requesting unmount twice.
fn install_ctrlc_handler(mount_point: U16CString) -> Result<(), ctrlc::Error> {
    let _ = MOUNT_POINT.set(mount_point);

    ctrlc::set_handler(|| {
        if UNMOUNT_REQUESTED.set(()).is_err() {
            return;
        }

        if let Some(mount_point) = MOUNT_POINT.get() {
            log::info!("Ctrl-C received, requesting unmount");
            dokan::unmount(mount_point);
        }
    })
}

fn describe_mount_error(err: dokan::MountError) -> String {
    match err {
        dokan::MountError::DriveLetterError => "drive letter is invalid or already in use".into(),
        dokan::MountError::DriverInstallError => "the Dokan driver is not installed".into(),
        dokan::MountError::StartError => "the Dokan driver failed to start".into(),
        dokan::MountError::MountError => "Dokan failed to assign the mount point".into(),
        dokan::MountError::MountPointError => "mount point is invalid or already in use".into(),
        dokan::MountError::VersionError => "Dokan driver version does not match this library".into(),
        _ => "unknown Dokan mount failure".into(),
    }
}

fn path_to_u16cstring(path: &Path) -> U16CString {
    U16CString::from_os_str(path.as_os_str()).expect("mount path contains an interior NUL")
}

pub fn run(args: &MountArgs) -> Result<(), AppError> {
    if !args.iso_file.is_file() {
        return Err(AppError::FileOpenError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a file", args.iso_file.display()),
        )));
    }

    if args.mount_path.exists() {
        return Err(AppError::MountPointExists(args.mount_path.clone()));
    }

    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let container = Arc::new(Container::open(&args.iso_file)?);
    let handler = XdvdfsHandler::new(container, args.launch);

    let mount_point = path_to_u16cstring(&args.mount_path);

    let mut flags =
        dokan::MountFlags::ALT_STREAM | dokan::MountFlags::WRITE_PROTECT | dokan::MountFlags::CURRENT_SESSION;
    if args.debug {
        flags |= dokan::MountFlags::STDERR | dokan::MountFlags::DEBUG;
    }

    let options = dokan::MountOptions {
        single_thread: false,
        flags,
        timeout: std::time::Duration::from_secs(0),
        allocation_unit_size: 0,
        sector_size: 0,
    };

    if let Err(err) = install_ctrlc_handler(mount_point.clone()) {
        log::warn!("could not install Ctrl-C handler: {err}");
    }

    dokan::init();
    let mount_result = dokan::FileSystemMounter::new(&handler, &mount_point, &options).mount();
    dokan::shutdown();

    mount_result.map_err(|err| AppError::BridgeError(describe_mount_error(err)))
}
