use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use structopt::StructOpt;

use tcp_kv::connection::{bind, serve};
use tcp_kv::persistence;
use tcp_kv::store::Store;
use tcp_kv::wire::DEFAULT_SERVER_ADDR;

#[derive(Debug, StructOpt)]
#[structopt(name = "server")]
struct Args {
    /// Service listening address
    #[structopt(long, default_value = DEFAULT_SERVER_ADDR, global = true)]
    addr: SocketAddr,
    /// Snapshot file used by SAVE and LOAD
    #[structopt(long, default_value = "tcp_kv.csv", parse(from_os_str))]
    snapshot: PathBuf,
}

fn main() -> io::Result<()> {
    env_logger::init();
    let args = Args::from_args();

    let store = match persistence::load(&args.snapshot) {
        Ok(store) => {
            log::info!("restored snapshot from {}", args.snapshot.display());
            store
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Store::new(),
        Err(e) => {
            log::warn!("could not restore {}: {}", args.snapshot.display(), e);
            Store::new()
        }
    };

    let listener = bind(args.addr)?;
    serve(listener, Arc::new(Mutex::new(store)), args.snapshot)
}
