use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;

use anyhow::Context;
use burrowio::line::READ_BLOCK;
use burrowio::{Event, Handler, Reactor, Token};
use mudworld::{EntityId, EntityKey, Kind, World};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::{self, Ctx};
use crate::session::{Conn, Session, Staged};
use crate::tell::Sessions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Read,
    Write,
}

pub struct Server {
    pub world: World,
    pub sessions: Sessions,
    config: Config,
    welcome: String,
    autosave: Option<Token>,
    tokens: HashMap<Token, (EntityId, Half)>,
}

impl Server {
    pub fn new(config: Config, welcome: String) -> Self {
        Self {
            world: World::new(),
            sessions: Sessions::default(),
            config,
            welcome,
            autosave: None,
            tokens: HashMap::new(),
        }
    }

    pub fn start_autosave(&mut self, reactor: &mut Reactor) {
        if let Some(period) = self.config.autosave {
            info!(every_s = period.as_secs(), "autosave enabled");
            self.autosave = Some(reactor.add_timer(period));
        }
    }

    /// Create a player in the start room with a session that has no socket.
    pub fn spawn_detached(&mut self, key: &EntityKey) -> EntityId {
        let player = self.world.find(key);
        let start = self.world.find(&self.config.start_room);
        self.world.reparent(player, Some(start));
        self.sessions
            .insert(Session::detached(player, key.to_string()));
        player
    }

    /// Feed a world script through a throwaway loader session. Returns the
    /// number of lines replayed.
    pub fn replay(&mut self, script: &str) -> usize {
        let Ok(key) = EntityKey::new(Kind::Player, "loader") else {
            return 0;
        };
        let loader = self.spawn_detached(&key);

        let mut n = 0;
        for (i, line) in script.lines().enumerate() {
            self.input(loader, line);
            if let Some(s) = self.sessions.get_mut(loader) {
                if std::mem::take(&mut s.refused) > 0 {
                    let reply = s.out.text();
                    warn!(line = i + 1, command = %line, reply = %reply.trim(), "world script line refused");
                }
                s.out.reset();
            }
            n += 1;
        }

        self.sessions.remove(loader);
        self.world.free(loader);
        n
    }

    pub fn load_world(&mut self) -> anyhow::Result<usize> {
        let path = self.config.world_path.clone();
        let script = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "no world script; starting empty");
                return Ok(0);
            }
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        let n = self.replay(&script);
        info!(path = %path.display(), lines = n, rooms = self.world.max_id(Kind::Room), "world loaded");
        Ok(n)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        mudworld::script::save(&self.world, &self.config.world_path)
            .with_context(|| format!("save {}", self.config.world_path.display()))?;
        Ok(())
    }

    /// One framed line from `player`: heredoc staging, then dispatch.
    pub fn input(&mut self, player: EntityId, line: &str) {
        let Some(session) = self.sessions.get_mut(player) else {
            return;
        };
        match session.stage(line) {
            Staged::Pending => {}
            Staged::Refused => {
                session.refused += 1;
                warn!(player = %session.label, "heredoc too long, line dropped");
                self.sessions
                    .tell(player, "Too much text; that line was discarded.");
                self.sessions.end(player);
            }
            Staged::Command(cmd) => {
                let mut ctx = Ctx {
                    world: &mut self.world,
                    sessions: &mut self.sessions,
                    config: &self.config,
                    player,
                };
                dispatch::run(&mut ctx, &cmd);
                self.sessions.end(player);
            }
        }
    }

    fn accept(&mut self, reactor: &mut Reactor, res: io::Result<(TcpStream, SocketAddr)>) {
        let (stream, peer) = match res {
            Ok(x) => x,
            Err(e) => {
                warn!(error = %e, "accept failed");
                return;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, error = %e, "set_nodelay failed");
        }

        let Some(n) = self.world.next_id(Kind::Player) else {
            warn!(%peer, "no player numbers left, connection refused");
            return;
        };
        let key = EntityKey::numbered(Kind::Player, n);
        let player = self.world.find(&key);
        let start = self.world.find(&self.config.start_room);
        self.world.reparent(player, Some(start));

        let stream = Rc::new(stream);
        let read = reactor.add_readable(stream.clone());
        let write = reactor.add_writable(stream.clone());
        self.tokens.insert(read, (player, Half::Read));
        self.tokens.insert(write, (player, Half::Write));
        let conn = Conn {
            stream,
            peer,
            read,
            write,
        };
        self.sessions
            .insert(Session::connected(player, key.to_string(), conn));
        info!(%peer, player = %key, "connected");

        self.sessions.tell(player, &self.welcome);
        self.sessions.end(player);
    }

    fn read(&mut self, reactor: &mut Reactor, player: EntityId) {
        let Some(session) = self.sessions.get_mut(player) else {
            return;
        };
        let Some(conn) = &session.conn else {
            return;
        };
        let (stream, peer) = (conn.stream.clone(), conn.peer);

        if let Some(discarded) = session.input.make_room() {
            warn!(%peer, discarded, "input line too long, discarded");
            self.sessions
                .tell(player, "Your line was too long and was discarded.");
            self.sessions.end(player);
        }
        let spare = self
            .sessions
            .get(player)
            .map_or(0, |s| s.input.spare());

        let mut buf = [0u8; READ_BLOCK];
        let n = match stream.try_read(&mut buf[..spare]) {
            Ok(0) => {
                self.close(reactor, player, "eof");
                return;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) => {
                self.close(reactor, player, &e.to_string());
                return;
            }
        };

        let Some(session) = self.sessions.get_mut(player) else {
            return;
        };
        session.input.extend(&buf[..n]);
        let mut lines = Vec::new();
        while let Some(framed) = session.input.next_line() {
            lines.push(framed);
        }
        for framed in lines {
            if framed.truncated {
                warn!(%peer, kept = framed.line.len(), "input line truncated");
            }
            debug!(%peer, line = %framed.line, "input");
            self.input(player, &framed.line);
        }
    }

    fn write(&mut self, reactor: &mut Reactor, token: Token, player: EntityId) {
        let Some(session) = self.sessions.get_mut(player) else {
            reactor.disarm(token);
            return;
        };
        let Some(stream) = session.conn.as_ref().map(|c| c.stream.clone()) else {
            return;
        };
        if session.out.is_empty() {
            reactor.disarm(token);
            return;
        }

        match stream.try_write(session.out.as_bytes()) {
            Ok(n) => {
                session.out.drain(n);
                if session.out.is_empty() {
                    session.out.reset();
                    reactor.disarm(token);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => self.close(reactor, player, &e.to_string()),
        }
    }

    /// Tear a session down and free its player.
    pub fn close(&mut self, reactor: &mut Reactor, player: EntityId, reason: &str) {
        let Some(session) = self.sessions.remove(player) else {
            return;
        };
        if session.in_heredoc() {
            debug!(player = %session.label, "unfinished heredoc dropped");
        }
        if let Some(conn) = session.conn {
            reactor.remove(conn.read);
            reactor.remove(conn.write);
            self.tokens.remove(&conn.read);
            self.tokens.remove(&conn.write);
            info!(
                peer = %conn.peer,
                player = %session.label,
                reason,
                online = self.sessions.len(),
                "disconnected"
            );
        }

        let room = self.world.parent(player);
        self.world.free(player);
        if let Some(room) = room {
            let text = format!("{} disappears.", session.label);
            self.sessions.tell_room(&self.world, room, None, &text);
        }
    }

    fn flush_dirty(&mut self, reactor: &mut Reactor) {
        for player in self.sessions.take_dirty() {
            let Some(s) = self.sessions.get(player) else {
                continue;
            };
            if let Some(conn) = &s.conn {
                if !s.out.is_empty() {
                    reactor.arm(conn.write);
                }
            }
        }
    }
}

impl Handler for Server {
    fn on_event(&mut self, reactor: &mut Reactor, event: Event) {
        match event {
            Event::Accept(_, res) => self.accept(reactor, res),
            Event::Readable(t) => match self.tokens.get(&t) {
                Some(&(player, Half::Read)) => self.read(reactor, player),
                _ => {
                    reactor.remove(t);
                }
            },
            Event::Writable(t) => match self.tokens.get(&t) {
                Some(&(player, Half::Write)) => self.write(reactor, t, player),
                _ => reactor.disarm(t),
            },
            Event::Timer(t) if Some(t) == self.autosave => {
                if let Err(e) = self.save() {
                    warn!(error = %e, "autosave failed");
                }
            }
            Event::Timer(_) => {}
        }
        self.flush_dirty(reactor);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mudtext::fmt::{BOLD, RESET};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn server() -> Server {
        Server::new(Config::default(), "Welcome to the burrow.".into())
    }

    fn key(s: &str) -> EntityKey {
        s.parse().unwrap()
    }

    fn join(s: &mut Server, n: u64) -> EntityId {
        s.spawn_detached(&EntityKey::numbered(Kind::Player, n))
    }

    fn take(s: &mut Server, p: EntityId) -> String {
        let out = &mut s.sessions.get_mut(p).unwrap().out;
        let text = out.text();
        out.reset();
        text
    }

    fn room(s: &Server, k: &str) -> EntityId {
        s.world.lookup(&key(k)).unwrap()
    }

    #[test]
    fn dig_opens_both_ways() {
        let mut s = server();
        let p = join(&mut s, 1);
        let q = join(&mut s, 2);

        s.input(p, "dig north");
        let r1 = room(&s, "room/1");
        let r2 = room(&s, "room/2");
        assert_eq!(s.world.room(r1).unwrap().exit_target("north"), Some(&key("room/2")));
        assert_eq!(s.world.room(r2).unwrap().exit_target("south"), Some(&key("room/1")));
        assert!(take(&mut s, p).contains("dig north to room/2."));
        assert!(take(&mut s, q).contains("Someone dug."));
    }

    #[test]
    fn dig_existing_direction_allocates_nothing() {
        let mut s = server();
        let p = join(&mut s, 1);
        s.input(p, "dig n");
        take(&mut s, p);
        s.input(p, "dig north");
        assert!(take(&mut s, p).contains("Cannot dig the way to north."));
        assert_eq!(s.world.max_id(Kind::Room), 2);
    }

    #[test]
    fn dig_help_and_odd_directions() {
        let mut s = server();
        let p = join(&mut s, 1);
        s.input(p, "dig ?");
        assert!(take(&mut s, p).contains("Direction or room ID."));
        s.input(p, "dig to:room/9 hole ?");
        assert!(take(&mut s, p).contains("Reverse direction"));
        s.input(p, "dig to:room/9 hole");
        assert!(take(&mut s, p).contains("No reverse direction."));
        let r9 = room(&s, "room/9");
        assert!(s.world.room(r9).unwrap().exits().is_empty());
        s.input(p, "dig to:player/3 up");
        assert!(take(&mut s, p).contains("only dig to rooms"));
    }

    #[test]
    fn alias_walks_and_room_is_told() {
        let mut s = server();
        let p = join(&mut s, 1);
        let q = join(&mut s, 2);
        s.input(p, "dig north");
        s.input(p, "describe travel north You crawl north.");
        take(&mut s, q);

        s.input(p, "n");
        assert_eq!(s.world.parent(p), Some(room(&s, "room/2")));
        assert!(take(&mut s, p).contains("You crawl north."));
        assert!(take(&mut s, q).contains("player/1 leaves to north."));

        s.input(q, "n");
        assert!(take(&mut s, p).contains("player/2 arrives."));
    }

    #[test]
    fn heredoc_sets_title() {
        let mut s = server();
        let p = join(&mut s, 1);
        for line in ["describe title <", "\tA damp", "\tcave.", "\t."] {
            s.input(p, line);
        }
        assert_eq!(s.world.title(room(&s, "room/1")), Some("A damp cave."));
        assert!(take(&mut s, p).contains("Title updated."));
    }

    #[test]
    fn look_highlights_exits_and_lists_others() {
        let mut s = server();
        let p = join(&mut s, 1);
        join(&mut s, 2);
        s.input(p, "dig north");
        s.input(p, "describe exit north A crack opens to the north.");
        take(&mut s, p);

        s.input(p, "look");
        let out = take(&mut s, p);
        assert!(out.contains(&format!("{BOLD}north{RESET}.")));
        assert!(out.contains("There is player/2 here."));
        assert!(!out.contains("There is player/1"));
    }

    #[test]
    fn unknown_verbs_get_suggestions() {
        let mut s = server();
        let p = join(&mut s, 1);
        s.input(p, "lok");
        assert!(take(&mut s, p).contains("Try look?"));
        s.input(p, "xyzzyxyzzyxyzzy");
        assert!(take(&mut s, p).contains("Xyzzyxyzzyxyzzy?"));
        s.input(p, "g");
        let out = take(&mut s, p);
        assert!(out.contains("Go?") && out.contains("Goto?"));
    }

    #[test]
    fn room_verbs_hidden_outside_rooms() {
        let mut s = server();
        let p = join(&mut s, 1);
        s.input(p, "goto item/box");
        take(&mut s, p);
        s.input(p, "dig north");
        let out = take(&mut s, p);
        assert!(!out.contains("You dig"));
        s.input(p, "look");
        assert!(take(&mut s, p).contains("This location: item/box."));
    }

    #[test]
    fn collapse_removes_one_way() {
        let mut s = server();
        let p = join(&mut s, 1);
        s.input(p, "dig north");
        s.input(p, "collapse north");
        assert!(take(&mut s, p).contains("The way north collapses."));
        assert!(s.world.room(room(&s, "room/1")).unwrap().exits().is_empty());
        assert_eq!(s.world.room(room(&s, "room/2")).unwrap().exit_keys(), vec!["south"]);
    }

    #[test]
    fn say_and_objects() {
        let mut s = server();
        let p = join(&mut s, 1);
        let q = join(&mut s, 2);
        s.input(p, "say hello there");
        assert!(take(&mut s, p).contains("You say: hello there"));
        assert!(take(&mut s, q).contains("player/1 says: hello there"));

        s.input(p, "objects");
        assert!(take(&mut s, p).contains("player/1, room/1, player/2."));
    }

    #[test]
    fn dig_refused_when_room_numbers_run_out() {
        let mut s = server();
        let p = join(&mut s, 1);
        s.input(p, "goto room/18446744073709551615");
        take(&mut s, p);

        s.input(p, "dig north");
        assert!(take(&mut s, p).contains("There are no room numbers left"));
        let top = room(&s, "room/18446744073709551615");
        assert!(s.world.room(top).unwrap().exits().is_empty());
        assert_eq!(s.sessions.get(p).unwrap().refused, 1);

        // A named destination still works.
        s.input(p, "dig to:room/1 down");
        assert!(take(&mut s, p).contains("You dig down to room/1."));
    }

    #[test]
    fn objects_filters_by_glob() {
        let mut s = server();
        let p = join(&mut s, 1);
        s.input(p, "dig north");
        take(&mut s, p);

        s.input(p, "objects room/*");
        assert!(take(&mut s, p).contains("room/1, room/2."));
        s.input(p, "objects item/*");
        assert!(take(&mut s, p).contains("Nothing matches."));
        s.input(p, "objects room/[");
        assert!(take(&mut s, p).contains("Bad pattern"));
    }

    #[test]
    fn refused_commands_are_counted() {
        let mut s = server();
        let p = join(&mut s, 1);
        s.input(p, "dig north");
        s.input(p, "look");
        assert_eq!(s.sessions.get(p).unwrap().refused, 0);
        s.input(p, "dig north");
        s.input(p, "describe exit west A wall.");
        assert_eq!(s.sessions.get(p).unwrap().refused, 2);
    }

    #[test]
    fn replay_skips_bad_lines_and_keeps_going() {
        let mut s = server();
        let script = "goto room/1\n\
                      dig to:room/2 north -\n\
                      dig to:room/3 north -\n\
                      goto not-a-key\n\
                      goto room/2\n\
                      dig to:room/1 south -\n";
        assert_eq!(s.replay(script), 6);
        let r1 = s.world.room(room(&s, "room/1")).unwrap();
        assert_eq!(r1.exit_target("north"), Some(&key("room/2")));
        let r2 = s.world.room(room(&s, "room/2")).unwrap();
        assert_eq!(r2.exit_target("south"), Some(&key("room/1")));
        assert_eq!(s.world.lookup(&key("player/loader")), None);
    }

    #[test]
    fn save_then_replay_rebuilds_rooms() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            world_path: dir.path().join("rooms.txt"),
            ..Config::default()
        };

        let mut s = Server::new(config.clone(), String::new());
        let p = join(&mut s, 1);
        s.input(p, "dig north");
        s.input(p, "describe title <");
        s.input(p, &"stone ".repeat(20));
        s.input(p, ".");
        s.input(p, "describe travel north You squeeze through.");
        s.input(p, "describe exit north A crack opens north.");
        s.input(p, "describe save");
        assert!(take(&mut s, p).contains("Saved."));

        let mut t = Server::new(config, String::new());
        assert!(t.load_world().unwrap() > 0);
        let r1 = room(&t, "room/1");
        let r2 = room(&t, "room/2");
        assert_eq!(t.world.title(r1), s.world.title(room(&s, "room/1")));
        let exits = t.world.room(r1).unwrap();
        assert_eq!(exits.exit_target("north"), Some(&key("room/2")));
        assert_eq!(exits.travel_desc("north"), Some("You squeeze through."));
        assert_eq!(exits.exit_desc("north"), Some("A crack opens north."));
        assert_eq!(t.world.room(r2).unwrap().exit_target("south"), Some(&key("room/1")));
        assert_eq!(t.world.max_id(Kind::Room), 2);
        assert_eq!(t.world.lookup(&key("player/loader")), None);
        assert_eq!(t.sessions.len(), 0);
    }

    #[test]
    fn missing_world_script_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            world_path: dir.path().join("absent.txt"),
            ..Config::default()
        };
        let mut s = Server::new(config, String::new());
        assert_eq!(s.load_world().unwrap(), 0);
    }

    #[test]
    fn close_frees_player_and_tells_room() {
        let mut s = server();
        let mut reactor = Reactor::new(Duration::from_secs(1));
        let p = join(&mut s, 1);
        let q = join(&mut s, 2);

        s.close(&mut reactor, p, "test");
        assert_eq!(s.world.lookup(&key("player/1")), None);
        assert!(s.sessions.get(p).is_none());
        assert!(take(&mut s, q).contains("player/1 disappears."));
    }

    async fn read_until(c: &mut TcpStream, got: &mut String, needle: &str) {
        let mut buf = [0u8; 1024];
        while !got.contains(needle) {
            let n = c.read(&mut buf).await.unwrap();
            assert!(n > 0, "server hung up");
            got.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
    }

    #[tokio::test]
    async fn accept_refused_when_player_numbers_run_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut reactor = Reactor::new(Duration::from_secs(1));
        let mut s = server();
        s.world.find(&EntityKey::numbered(Kind::Player, u64::MAX));
        let before = s.world.len();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let accepted = listener.accept().await;
        s.accept(&mut reactor, accepted);

        assert_eq!(s.sessions.len(), 0);
        assert_eq!(reactor.len(), 0);
        assert_eq!(s.world.len(), before);
        let mut buf = [0u8; 64];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn overlong_input_is_discarded_and_told() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut reactor = Reactor::new(Duration::from_secs(1));
        let mut s = server();
        reactor.add_listener(listener);

        let mut client = tokio::spawn(async move {
            let mut c = TcpStream::connect(addr).await.unwrap();
            let mut got = String::new();
            read_until(&mut c, &mut got, "Welcome to the burrow.").await;
            // Exactly one buffer of bytes with no line end, then a real line.
            c.write_all(&[b'x'; READ_BLOCK]).await.unwrap();
            c.write_all(b"\nsay still here\n").await.unwrap();
            read_until(&mut c, &mut got, "You say: still here").await;
            got
        });

        let got = loop {
            tokio::select! {
                res = reactor.dispatch(&mut s) => res.unwrap(),
                out = &mut client => break out.unwrap(),
            }
        };
        let told = got.find("Your line was too long and was discarded.").unwrap();
        let said = got.find("You say: still here").unwrap();
        assert!(told < said);
        assert!(!got.contains("xxx"));
    }

    #[tokio::test]
    async fn serves_a_client_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut reactor = Reactor::new(Duration::from_secs(1));
        let mut s = server();
        reactor.add_listener(listener);

        let mut client = tokio::spawn(async move {
            let mut c = TcpStream::connect(addr).await.unwrap();
            let mut got = String::new();
            read_until(&mut c, &mut got, "Welcome to the burrow.").await;
            c.write_all(b"dig north\r\nsay hi\n").await.unwrap();
            read_until(&mut c, &mut got, "You say: hi").await;
            got
        });

        let got = loop {
            tokio::select! {
                res = reactor.dispatch(&mut s) => res.unwrap(),
                out = &mut client => break out.unwrap(),
            }
        };
        assert!(got.contains("dig north to room/2."));
        assert!(s.world.lookup(&key("room/2")).is_some());

        // The client hung up; its player goes away.
        while s.sessions.len() > 0 {
            reactor.dispatch(&mut s).await.unwrap();
        }
        assert_eq!(s.world.lookup(&key("player/1")), None);
        assert_eq!(reactor.len(), 1);
    }
}
