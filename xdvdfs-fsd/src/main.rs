mod container;
mod error;

#[cfg(windows)]
mod fsproto;

#[cfg(windows)]
mod mount;

#[cfg(windows)]
use mount::MountArgs;

#[cfg(windows)]
fn main() {
    env_logger::init();

    let args = MountArgs::parse_args();

    if let Err(err) = mount::run(&args) {
        log::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("xdvdfsd mounts via Dokan and only runs on Windows");
    std::process::exit(1);
}
