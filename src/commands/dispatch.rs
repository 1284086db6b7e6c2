//! Command Dispatcher
//!
//! Maps a decoded command's verb to a handler, executes it against the
//! shared store, and produces a typed reply. Dispatch is stateless: one
//! decode, execute, encode cycle per command with no cross-command state
//! beyond the store itself.
//!
//! ## Supported Commands
//!
//! - `SET key value [EX seconds | PX milliseconds]` → `+OK`
//! - `GET key` → bulk string or null bulk
//! - `DEL key [key ...]` → integer count removed
//! - `EXISTS key [key ...]` → integer count present
//! - `INCR key` / `DECR key` → integer new value
//! - `EXPIRE key seconds` → `:1` or `:0`
//! - `TTL key` → `:-2`, `:-1`, or seconds remaining
//! - `KEYS pattern` → array of bulk strings
//!
//! Verbs are case-insensitive. Unknown verbs reply `-ERR unknown command`.

use crate::protocol::{Command, Reply};
use crate::storage::Store;
use std::sync::Arc;
use std::time::Duration;

/// Executes commands against the shared store.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Executes one command and returns the reply to send back.
    pub fn execute(&self, command: Command) -> Reply {
        let args = command.args();
        match command.name().as_str() {
            "SET" => self.set(args),
            "GET" => self.get(args),
            "DEL" => self.del(args),
            "EXISTS" => self.exists(args),
            "INCR" => self.incr(args),
            "DECR" => self.decr(args),
            "EXPIRE" => self.expire(args),
            "TTL" => self.ttl(args),
            "KEYS" => self.keys(args),
            _ => Reply::error("unknown command"),
        }
    }

    /// SET key value [EX seconds | PX milliseconds]
    ///
    /// Option tokens after the value are scanned left to right: each
    /// recognized pair consumes two tokens, anything unrecognized consumes
    /// one and is skipped.
    fn set(&self, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("wrong number of arguments for 'SET' command");
        }

        let key = args[0].clone();
        let value = args[1].clone();

        let mut ttl: Option<Duration> = None;
        let mut i = 2;
        while i < args.len() {
            match args[i].to_uppercase().as_str() {
                "EX" => {
                    let Some(secs) = args.get(i + 1).and_then(|t| parse_ttl_operand(t)) else {
                        return Reply::error("invalid expire time");
                    };
                    ttl = Some(Duration::from_secs(secs));
                    i += 2;
                }
                "PX" => {
                    let Some(ms) = args.get(i + 1).and_then(|t| parse_ttl_operand(t)) else {
                        return Reply::error("invalid expire time");
                    };
                    ttl = Some(Duration::from_millis(ms));
                    i += 2;
                }
                _ => i += 1,
            }
        }

        match ttl {
            Some(ttl) => self.store.set_with_ttl(key, value, ttl),
            None => self.store.set(key, value),
        }
        Reply::ok()
    }

    /// GET key
    fn get(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return Reply::error("wrong number of arguments for 'GET' command");
        }

        match self.store.get(&args[0]) {
            Some(value) => Reply::bulk(value),
            None => Reply::null(),
        }
    }

    /// DEL key [key ...]
    fn del(&self, args: &[String]) -> Reply {
        if args.is_empty() {
            return Reply::error("wrong number of arguments for 'DEL' command");
        }

        Reply::integer(self.store.del(args) as i64)
    }

    /// EXISTS key [key ...]
    fn exists(&self, args: &[String]) -> Reply {
        if args.is_empty() {
            return Reply::error("wrong number of arguments for 'EXISTS' command");
        }

        Reply::integer(self.store.exists(args) as i64)
    }

    /// INCR key
    fn incr(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return Reply::error("wrong number of arguments for 'INCR' command");
        }

        match self.store.incr(&args[0]) {
            Ok(n) => Reply::integer(n),
            Err(e) => Reply::error(e.to_string()),
        }
    }

    /// DECR key
    fn decr(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return Reply::error("wrong number of arguments for 'DECR' command");
        }

        match self.store.decr(&args[0]) {
            Ok(n) => Reply::integer(n),
            Err(e) => Reply::error(e.to_string()),
        }
    }

    /// EXPIRE key seconds
    fn expire(&self, args: &[String]) -> Reply {
        if args.len() != 2 {
            return Reply::error("wrong number of arguments for 'EXPIRE' command");
        }

        let Some(secs) = parse_ttl_operand(&args[1]) else {
            return Reply::error("invalid expire time");
        };

        let scheduled = self.store.expire(&args[0], Duration::from_secs(secs));
        Reply::integer(if scheduled { 1 } else { 0 })
    }

    /// TTL key
    fn ttl(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return Reply::error("wrong number of arguments for 'TTL' command");
        }

        Reply::integer(self.store.ttl(&args[0]).as_wire_integer())
    }

    /// KEYS pattern
    fn keys(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return Reply::error("wrong number of arguments for 'KEYS' command");
        }

        let matched = self
            .store
            .keys(&args[0])
            .into_iter()
            .map(Reply::bulk)
            .collect();
        Reply::array(matched)
    }
}

/// Parses a non-negative TTL operand (seconds or milliseconds).
fn parse_ttl_operand(token: &str) -> Option<u64> {
    token.parse::<i64>().ok().filter(|n| *n >= 0).map(|n| n as u64)
}
