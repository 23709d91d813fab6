use std::path::PathBuf;
use std::time::Duration;

use mudworld::EntityKey;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_host: String,
    pub port: u16,
    pub world_path: PathBuf,
    pub welcome_path: PathBuf,
    pub start_room: EntityKey,
    pub tick: Duration,
    pub autosave: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "*".to_string(),
            port: 4000,
            world_path: "rooms.txt".into(),
            welcome_path: "welcome".into(),
            start_room: EntityKey::numbered(mudworld::Kind::Room, 1),
            tick: Duration::from_millis(1000),
            autosave: None,
        }
    }
}

pub fn usage_and_exit() -> ! {
    eprintln!(
        "burrowd (world server)\n\n\
USAGE:\n  burrowd [--bind HOST] [--port PORT] [--world PATH] [--welcome PATH]\n          [--start-room KEY] [--tick-ms MS] [--autosave-s SECS]\n\n\
ENV:\n  BURROW_BIND        default * (every IPv4 interface)\n  BURROW_PORT        default 4000\n  BURROW_WORLD       default rooms.txt (replayed at startup, written by `describe save`)\n  BURROW_WELCOME     default welcome (text shown on connect)\n  BURROW_START_ROOM  default room/1\n  BURROW_TICK_MS     default 1000 (timer resolution)\n  BURROW_AUTOSAVE_S  default 0 (off)\n  RUST_LOG           default info,burrowd=info\n"
    );
    std::process::exit(2);
}

pub fn parse_args() -> Config {
    from_sources(|k| std::env::var(k).ok(), std::env::args().skip(1))
        .unwrap_or_else(|_| usage_and_exit())
}

/// Environment first, then `--flag value` pairs on top.
pub fn from_sources(
    env: impl Fn(&str) -> Option<String>,
    args: impl IntoIterator<Item = String>,
) -> Result<Config, String> {
    let mut cfg = Config::default();

    if let Some(v) = env("BURROW_BIND").filter(|v| !v.trim().is_empty()) {
        cfg.bind_host = v;
    }
    if let Some(v) = env("BURROW_PORT") {
        cfg.port = parse(&v, "BURROW_PORT")?;
    }
    if let Some(v) = env("BURROW_WORLD").filter(|v| !v.trim().is_empty()) {
        cfg.world_path = v.into();
    }
    if let Some(v) = env("BURROW_WELCOME").filter(|v| !v.trim().is_empty()) {
        cfg.welcome_path = v.into();
    }
    if let Some(v) = env("BURROW_START_ROOM") {
        cfg.start_room = parse(&v, "BURROW_START_ROOM")?;
    }
    if let Some(v) = env("BURROW_TICK_MS") {
        cfg.tick = Duration::from_millis(parse(&v, "BURROW_TICK_MS")?);
    }
    if let Some(v) = env("BURROW_AUTOSAVE_S") {
        cfg.autosave = autosave(parse(&v, "BURROW_AUTOSAVE_S")?);
    }

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let mut value = || it.next().ok_or_else(|| format!("{arg} needs a value"));
        match arg.as_str() {
            "--bind" => cfg.bind_host = value()?,
            "--port" => cfg.port = parse(&value()?, "--port")?,
            "--world" => cfg.world_path = value()?.into(),
            "--welcome" => cfg.welcome_path = value()?.into(),
            "--start-room" => cfg.start_room = parse(&value()?, "--start-room")?,
            "--tick-ms" => cfg.tick = Duration::from_millis(parse(&value()?, "--tick-ms")?),
            "--autosave-s" => cfg.autosave = autosave(parse(&value()?, "--autosave-s")?),
            _ => return Err(format!("unknown argument {arg}")),
        }
    }

    if cfg.start_room.kind() != mudworld::Kind::Room {
        return Err(format!("start room {} is not a room", cfg.start_room));
    }
    Ok(cfg)
}

fn parse<T: std::str::FromStr>(v: &str, what: &str) -> Result<T, String> {
    v.trim().parse().map_err(|_| format!("bad value for {what}: {v:?}"))
}

fn autosave(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults() {
        let cfg = from_sources(|_| None, Vec::new()).unwrap();
        assert_eq!(cfg.bind_host, "*");
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.world_path, PathBuf::from("rooms.txt"));
        assert_eq!(cfg.start_room.to_string(), "room/1");
        assert_eq!(cfg.tick, Duration::from_secs(1));
        assert_eq!(cfg.autosave, None);
    }

    #[test]
    fn flags_override_env() {
        let env = |k: &str| match k {
            "BURROW_PORT" => Some("5000".to_string()),
            "BURROW_AUTOSAVE_S" => Some("300".to_string()),
            _ => None,
        };
        let cfg = from_sources(env, args(&["--port", "6000", "--start-room", "room/9"])).unwrap();
        assert_eq!(cfg.port, 6000);
        assert_eq!(cfg.autosave, Some(Duration::from_secs(300)));
        assert_eq!(cfg.start_room.to_string(), "room/9");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(from_sources(|_| None, args(&["--port"])).is_err());
        assert!(from_sources(|_| None, args(&["--port", "x"])).is_err());
        assert!(from_sources(|_| None, args(&["--frobnicate"])).is_err());
        assert!(from_sources(|_| None, args(&["--start-room", "player/1"])).is_err());
        assert!(
            from_sources(|k| (k == "BURROW_START_ROOM").then(|| "nope".into()), Vec::new())
                .is_err()
        );
    }
}
