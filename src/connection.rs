//! Server loop: accept connections, run commands against the shared store

use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::command::Command;
use crate::persistence;
use crate::store::Store;
use crate::wire;

pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let listener = TcpListener::bind(addr)?;
    log::info!("listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept forever, one thread per connection. A bad connection is logged
/// and dropped without taking the server down.
pub fn serve(listener: TcpListener, store: Arc<Mutex<Store>>, snapshot: PathBuf) -> io::Result<()> {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("accept failed: {}", e);
                continue;
            }
        };
        let store = Arc::clone(&store);
        let snapshot = snapshot.clone();
        thread::spawn(move || {
            if let Err(e) = handle_client(stream, &store, &snapshot) {
                log::warn!("connection error: {}", e);
            }
        });
    }
    Ok(())
}

/// Given a TcpStream:
/// - Read the request until the client half-closes
/// - Parse and run the command
/// - Write the reply and close
fn handle_client(mut stream: TcpStream, store: &Mutex<Store>, snapshot: &Path) -> io::Result<()> {
    let peer_addr = stream.peer_addr()?;
    let request = wire::read_request(&mut stream)?;
    log::debug!("{} -> {:?}", peer_addr, request);

    let reply = match request.parse::<Command>() {
        Ok(command) => {
            // A connection thread that panicked mid-command poisons the
            // mutex; the map itself is still usable, so keep serving.
            let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
            execute(command, &mut store, snapshot)
        }
        Err(e) => format!("ERR {}", e),
    };

    log::debug!("{} <- {:?}", peer_addr, reply);
    stream.write_all(reply.as_bytes())
}

/// Run one command, returning the reply line to send back
pub fn execute(command: Command, store: &mut Store, snapshot: &Path) -> String {
    match command {
        Command::Set(key, value) => {
            store.set(key, value);
            "OK".to_string()
        }
        Command::Get(key) => match store.get(&key) {
            Some(value) => value.to_string(),
            None => "(nil)".to_string(),
        },
        Command::Del(key) => bit(store.del(&key)),
        Command::Exists(key) => bit(store.exists(&key)),
        Command::Expire(key, lifetime) => bit(store.expire(&key, lifetime)),
        Command::Incr(key) => match store.incr(&key) {
            Ok(n) => n.to_string(),
            Err(e) => format!("ERR {}", e),
        },
        Command::Decr(key) => match store.decr(&key) {
            Ok(n) => n.to_string(),
            Err(e) => format!("ERR {}", e),
        },
        Command::Clear => {
            store.clear();
            "OK".to_string()
        }
        Command::Save => match persistence::save(store, snapshot) {
            Ok(()) => "OK".to_string(),
            Err(e) => format!("ERR {}", e),
        },
        Command::Load => match persistence::load(snapshot) {
            Ok(loaded) => {
                *store = loaded;
                "OK".to_string()
            }
            Err(e) => format!("ERR {}", e),
        },
    }
}

fn bit(b: bool) -> String {
    if b { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn run(line: &str, store: &mut Store) -> String {
        let snapshot = Path::new("unused-snapshot.csv");
        match line.parse::<Command>() {
            Ok(command) => execute(command, store, snapshot),
            Err(e) => format!("ERR {}", e),
        }
    }

    #[test]
    fn test_set_get_del_replies() {
        let mut store = Store::new();
        assert_eq!(run("SET greeting hello", &mut store), "OK");
        assert_eq!(run("GET greeting", &mut store), "hello");
        assert_eq!(run("DEL greeting", &mut store), "1");
        assert_eq!(run("DEL greeting", &mut store), "0");
        assert_eq!(run("GET greeting", &mut store), "(nil)");
    }

    #[test]
    fn test_exists_and_expire_replies() {
        let mut store = Store::new();
        assert_eq!(run("EXISTS k", &mut store), "0");
        assert_eq!(run("SET k v", &mut store), "OK");
        assert_eq!(run("EXISTS k", &mut store), "1");
        assert_eq!(run("EXPIRE k 1h", &mut store), "1");
        assert_eq!(run("EXPIRE ghost 1h", &mut store), "0");
    }

    #[test]
    fn test_expire_with_oversized_duration() {
        let mut store = Store::new();
        assert_eq!(run("SET k v", &mut store), "OK");
        assert_eq!(run("EXPIRE k 500000000000years", &mut store), "1");
        assert_eq!(run("GET k", &mut store), "v");
    }

    #[test]
    fn test_incr_replies() {
        let mut store = Store::new();
        assert_eq!(run("INCR hits", &mut store), "1");
        assert_eq!(run("INCR hits", &mut store), "2");
        assert_eq!(run("DECR hits", &mut store), "1");
        assert_eq!(run("SET hits nine", &mut store), "OK");
        assert!(run("INCR hits", &mut store).starts_with("ERR "));
    }

    #[test]
    fn test_parse_errors_become_err_replies() {
        let mut store = Store::new();
        assert!(run("FROB k", &mut store).starts_with("ERR "));
        assert!(run("", &mut store).starts_with("ERR "));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "tcp_kv_connection_test_{}.csv",
            std::process::id()
        ));
        let mut store = Store::new();
        store.set("persisted".to_string(), "yes".to_string());

        assert_eq!(execute(Command::Save, &mut store, &path), "OK");
        store.clear();
        assert_eq!(execute(Command::Load, &mut store, &path), "OK");
        std::fs::remove_file(&path).unwrap();

        assert_eq!(store.get("persisted"), Some("yes"));
    }

    #[test]
    fn test_end_to_end_over_tcp() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Mutex::new(Store::new()));
        let snapshot = std::env::temp_dir().join("tcp_kv_e2e_unused.csv");
        thread::spawn(move || serve(listener, store, snapshot));

        assert_eq!(
            wire::exchange(addr, "SET greeting hello").unwrap(),
            Some("OK".to_string())
        );
        assert_eq!(
            wire::exchange(addr, "GET greeting").unwrap(),
            Some("hello".to_string())
        );
        assert_eq!(
            wire::exchange(addr, "EXPIRE greeting 0s").unwrap(),
            Some("1".to_string())
        );
        assert_eq!(
            wire::exchange(addr, "GET greeting").unwrap(),
            Some("(nil)".to_string())
        );
        assert_eq!(
            wire::exchange(addr, "NONSENSE").unwrap(),
            Some("ERR 'NONSENSE' is not a command".to_string())
        );
    }

    #[test]
    fn test_server_survives_poisoned_store() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Mutex::new(Store::new()));
        let snapshot = std::env::temp_dir().join("tcp_kv_poison_unused.csv");

        // Poison the mutex the way a panicking connection thread would
        let poisoner = Arc::clone(&store);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(store.lock().is_err());

        thread::spawn(move || serve(listener, store, snapshot));
        assert_eq!(
            wire::exchange(addr, "SET k v").unwrap(),
            Some("OK".to_string())
        );
        assert_eq!(
            wire::exchange(addr, "GET k").unwrap(),
            Some("v".to_string())
        );
    }

    #[test]
    fn test_expired_entry_not_saved() {
        let mut store = Store::new();
        store.set("fleeting".to_string(), "x".to_string());
        store.expire("fleeting", Duration::from_secs(0));
        let csv = persistence::to_csv(&store).unwrap();
        assert!(csv.is_empty());
    }
}
