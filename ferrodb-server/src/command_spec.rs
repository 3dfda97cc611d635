//! # Command Spec Registry
//!
//! A declarative table of every recognized verb: its arity bounds, which
//! token positions (if any) must parse as an integer, and the usage string
//! shown in arity errors. The verb set is closed — [`lookup`] returning
//! `None` is how the validator recognizes an unknown command.

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub min_tokens: usize,
    pub max_tokens: Option<usize>,
    pub usage: &'static str,
    pub integer_positions: &'static [usize],
}

/// Looks up the `CommandSpec` for an already-uppercased verb. `SET` and `CACHESET`
/// are registered with a fixed post-merge arity (3 and 4 tokens
/// respectively) — [`crate::dispatcher`] folds any trailing value tokens
/// into one before validation ever sees them.
pub fn lookup(verb: &str) -> Option<CommandSpec> {
    match verb {
        "PING" => Some(CommandSpec {
            min_tokens: 1,
            max_tokens: Some(1),
            usage: "PING",
            integer_positions: &[],
        }),
        "ECHO" => Some(CommandSpec {
            min_tokens: 2,
            max_tokens: None,
            usage: "ECHO message",
            integer_positions: &[],
        }),
        "SET" => Some(CommandSpec {
            min_tokens: 3,
            max_tokens: Some(3),
            usage: "SET key value",
            integer_positions: &[],
        }),
        "GET" => Some(CommandSpec {
            min_tokens: 2,
            max_tokens: Some(2),
            usage: "GET key",
            integer_positions: &[],
        }),
        "DEL" => Some(CommandSpec {
            min_tokens: 2,
            max_tokens: Some(2),
            usage: "DEL key",
            integer_positions: &[],
        }),
        "LPOP" => Some(CommandSpec {
            min_tokens: 2,
            max_tokens: Some(2),
            usage: "LPOP key",
            integer_positions: &[],
        }),
        "EXPIRE" => Some(CommandSpec {
            min_tokens: 3,
            max_tokens: Some(3),
            usage: "EXPIRE key seconds",
            integer_positions: &[2],
        }),
        "LPUSH" => Some(CommandSpec {
            min_tokens: 3,
            max_tokens: Some(3),
            usage: "LPUSH key value",
            integer_positions: &[],
        }),
        "RPUSH" => Some(CommandSpec {
            min_tokens: 3,
            max_tokens: Some(3),
            usage: "RPUSH key value",
            integer_positions: &[],
        }),
        "INSPECT" => Some(CommandSpec {
            min_tokens: 1,
            max_tokens: Some(1),
            usage: "INSPECT",
            integer_positions: &[],
        }),
        "CREATECACHE" => Some(CommandSpec {
            min_tokens: 2,
            max_tokens: Some(2),
            usage: "CREATECACHE name",
            integer_positions: &[],
        }),
        "DELETECACHE" => Some(CommandSpec {
            min_tokens: 2,
            max_tokens: Some(2),
            usage: "DELETECACHE name",
            integer_positions: &[],
        }),
        "LISTCACHES" => Some(CommandSpec {
            min_tokens: 1,
            max_tokens: Some(1),
            usage: "LISTCACHES",
            integer_positions: &[],
        }),
        "CACHESET" => Some(CommandSpec {
            min_tokens: 4,
            max_tokens: Some(4),
            usage: "CACHESET cache key value",
            integer_positions: &[],
        }),
        "CACHEGET" => Some(CommandSpec {
            min_tokens: 3,
            max_tokens: Some(3),
            usage: "CACHEGET cache key",
            integer_positions: &[],
        }),
        "CACHEDEL" => Some(CommandSpec {
            min_tokens: 3,
            max_tokens: Some(3),
            usage: "CACHEDEL cache key",
            integer_positions: &[],
        }),
        "CACHEKEYS" => Some(CommandSpec {
            min_tokens: 2,
            max_tokens: Some(2),
            usage: "CACHEKEYS cache",
            integer_positions: &[],
        }),
        "CACHEGETALL" => Some(CommandSpec {
            min_tokens: 2,
            max_tokens: Some(2),
            usage: "CACHEGETALL cache",
            integer_positions: &[],
        }),
        "EXIT" => Some(CommandSpec {
            min_tokens: 1,
            max_tokens: Some(1),
            usage: "EXIT",
            integer_positions: &[],
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_verb_has_no_spec() {
        assert!(lookup("NOPE").is_none());
    }

    #[test]
    fn expire_marks_its_seconds_position_as_integer() {
        let spec = lookup("EXPIRE").unwrap();
        assert_eq!(spec.integer_positions, &[2]);
    }
}
