//! Single-threaded readiness/timer reactor.
//!
//! The reactor owns a table of sources (a listening socket, the read and
//! write halves of client streams, periodic timers) and runs dispatch passes.
//! A pass blocks until some source is ready or the next timer is due, then
//! hands **at most one** I/O event to the [`Handler`]. Handlers run to
//! completion with `&mut Reactor`, so they can register and remove sources
//! without any locking.

use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tracing::debug;

use crate::clock::{Clock, Timer};

/// The source table starts this large and doubles whenever it fills up.
pub const SOURCE_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub usize);

#[derive(Debug)]
pub enum Source {
    Listener(TcpListener),
    Readable(Rc<TcpStream>),
    /// Only polled while armed.
    Writable {
        stream: Rc<TcpStream>,
        armed: bool,
    },
    Timer(Timer),
}

#[derive(Debug)]
pub enum Event {
    /// The listener produced a connection (or failed to).
    Accept(Token, io::Result<(TcpStream, SocketAddr)>),
    /// A stream has bytes, EOF or a pending error.
    Readable(Token),
    /// An armed stream can take more bytes.
    Writable(Token),
    Timer(Token),
}

#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error("nothing to wait on: no readable sources and no timers")]
    Idle,
}

pub trait Handler {
    fn on_event(&mut self, reactor: &mut Reactor, event: Event);
}

#[derive(Debug)]
pub struct Reactor {
    slots: Vec<Option<Source>>,
    free: Vec<usize>,
    cursor: usize,
    clock: Clock,
}

impl Reactor {
    pub fn new(tick: Duration) -> Self {
        Self {
            slots: Vec::with_capacity(SOURCE_CHUNK),
            free: Vec::new(),
            cursor: 0,
            clock: Clock::new(tick),
        }
    }

    pub fn tick(&self) -> Duration {
        self.clock.tick()
    }

    /// Number of live sources.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn add_listener(&mut self, listener: TcpListener) -> Token {
        self.register(Source::Listener(listener))
    }

    pub fn add_readable(&mut self, stream: Rc<TcpStream>) -> Token {
        self.register(Source::Readable(stream))
    }

    /// Register the write side of a stream. It starts disarmed.
    pub fn add_writable(&mut self, stream: Rc<TcpStream>) -> Token {
        self.register(Source::Writable {
            stream,
            armed: false,
        })
    }

    /// Register a periodic timer. The period is rounded down to whole ticks.
    pub fn add_timer(&mut self, period: Duration) -> Token {
        let ticks = self.clock.ticks_for(period);
        self.register(Source::Timer(Timer::new(ticks)))
    }

    /// Drop a source. Dropping the last handle of a stream closes it.
    pub fn remove(&mut self, token: Token) -> Option<Source> {
        let source = self.slots.get_mut(token.0)?.take()?;
        self.free.push(token.0);
        Some(source)
    }

    pub fn arm(&mut self, token: Token) {
        self.set_armed(token, true);
    }

    pub fn disarm(&mut self, token: Token) {
        self.set_armed(token, false);
    }

    pub fn is_armed(&self, token: Token) -> bool {
        matches!(
            self.slots.get(token.0),
            Some(Some(Source::Writable { armed: true, .. }))
        )
    }

    /// Run one dispatch pass.
    pub async fn dispatch<H: Handler>(&mut self, handler: &mut H) -> Result<(), ReactorError> {
        self.fire_timers(handler);

        let deadline = self.next_deadline();
        if deadline.is_none() && !self.has_io() {
            return Err(ReactorError::Idle);
        }

        let event = {
            let slots = &self.slots;
            let cursor = &mut self.cursor;
            let ready = poll_fn(|cx| poll_ready(slots, cursor, cx));
            match deadline {
                Some(at) => tokio::select! {
                    ev = ready => Some(ev),
                    _ = tokio::time::sleep_until(at) => None,
                },
                None => Some(ready.await),
            }
        };

        match event {
            Some(ev) => handler.on_event(self, ev),
            None => self.fire_timers(handler),
        }
        Ok(())
    }

    /// Add any source. Freed slots are reused before the table grows.
    pub fn register(&mut self, source: Source) -> Token {
        if let Some(i) = self.free.pop() {
            self.slots[i] = Some(source);
            return Token(i);
        }
        if self.slots.len() == self.slots.capacity() {
            let grow = self.slots.capacity().max(SOURCE_CHUNK);
            self.slots.reserve_exact(grow);
            debug!(capacity = self.slots.capacity(), "grew source table");
        }
        self.slots.push(Some(source));
        Token(self.slots.len() - 1)
    }

    fn set_armed(&mut self, token: Token, on: bool) {
        if let Some(Some(Source::Writable { armed, .. })) = self.slots.get_mut(token.0) {
            *armed = on;
        }
    }

    fn has_io(&self) -> bool {
        self.slots.iter().flatten().any(|s| match s {
            Source::Listener(_) | Source::Readable(_) => true,
            Source::Writable { armed, .. } => *armed,
            Source::Timer(_) => false,
        })
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .iter()
            .flatten()
            .filter_map(|s| match s {
                Source::Timer(t) => Some(t.remaining()),
                _ => None,
            })
            .min()
            .map(|ticks| self.clock.deadline(ticks))
    }

    fn fire_timers<H: Handler>(&mut self, handler: &mut H) {
        let ticks = self.clock.elapsed_ticks(Instant::now());
        for _ in 0..ticks {
            let fired: Vec<Token> = self
                .slots
                .iter_mut()
                .enumerate()
                .filter_map(|(i, s)| match s {
                    Some(Source::Timer(t)) => t.tick().then_some(Token(i)),
                    _ => None,
                })
                .collect();
            for token in fired {
                handler.on_event(self, Event::Timer(token));
            }
        }
    }
}

/// Scan the table once, starting after the source serviced last, and return
/// the first ready source. Polling errors count as readiness; the owner sees
/// the error on its next read or write.
fn poll_ready(
    slots: &[Option<Source>],
    cursor: &mut usize,
    cx: &mut Context<'_>,
) -> Poll<Event> {
    let n = slots.len();
    for k in 0..n {
        let i = (*cursor + k) % n;
        let token = Token(i);
        let event = match &slots[i] {
            Some(Source::Listener(l)) => match l.poll_accept(cx) {
                Poll::Ready(res) => Some(Event::Accept(token, res)),
                Poll::Pending => None,
            },
            Some(Source::Readable(s)) => s
                .poll_read_ready(cx)
                .is_ready()
                .then_some(Event::Readable(token)),
            Some(Source::Writable {
                stream,
                armed: true,
            }) => stream
                .poll_write_ready(cx)
                .is_ready()
                .then_some(Event::Writable(token)),
            _ => None,
        };
        if let Some(event) = event {
            *cursor = (i + 1) % n;
            return Poll::Ready(event);
        }
    }
    Poll::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[derive(Default)]
    struct Recorder {
        timers: Vec<(Token, u64)>,
        started: Option<Instant>,
        reads: Vec<Token>,
    }

    impl Handler for Recorder {
        fn on_event(&mut self, _reactor: &mut Reactor, event: Event) {
            match event {
                Event::Timer(t) => {
                    // Auto-advance may overshoot a deadline by a millisecond.
                    let at = self.started.map(|s| s.elapsed().as_secs()).unwrap_or_default();
                    self.timers.push((t, at));
                }
                Event::Readable(t) => self.reads.push(t),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn empty_reactor_is_idle() {
        let mut r = Reactor::new(Duration::from_secs(1));
        let mut h = Recorder::default();
        assert!(matches!(r.dispatch(&mut h).await, Err(ReactorError::Idle)));
    }

    #[tokio::test(start_paused = true)]
    async fn timers_fire_on_shared_clock() {
        let mut r = Reactor::new(Duration::from_secs(1));
        let mut h = Recorder {
            started: Some(Instant::now()),
            ..Default::default()
        };
        let a = r.add_timer(Duration::from_secs(3));
        let b = r.add_timer(Duration::from_millis(5500));

        for _ in 0..3 {
            r.dispatch(&mut h).await.unwrap();
        }

        assert_eq!(h.timers, vec![(a, 3), (b, 5), (a, 6)]);
    }

    #[tokio::test(start_paused = true)]
    async fn removed_timer_no_longer_fires() {
        let mut r = Reactor::new(Duration::from_secs(1));
        let mut h = Recorder::default();
        let a = r.add_timer(Duration::from_secs(1));
        let b = r.add_timer(Duration::from_secs(2));
        assert!(r.remove(a).is_some());
        assert!(r.remove(a).is_none());

        r.dispatch(&mut h).await.unwrap();
        assert_eq!(h.timers.len(), 1);
        assert_eq!(h.timers[0].0, b);
    }

    #[test]
    fn freed_tokens_are_reused() {
        let mut r = Reactor::new(Duration::from_secs(1));
        let a = r.add_timer(Duration::from_secs(1));
        let _b = r.add_timer(Duration::from_secs(1));
        r.remove(a);
        assert_eq!(r.len(), 1);
        assert_eq!(r.add_timer(Duration::from_secs(1)), a);
        assert!(r.capacity() >= SOURCE_CHUNK);
    }

    struct Echo {
        listener: Token,
        streams: Vec<(Token, Token, Rc<TcpStream>)>,
        got: Vec<u8>,
        wrote: bool,
    }

    impl Handler for Echo {
        fn on_event(&mut self, reactor: &mut Reactor, event: Event) {
            match event {
                Event::Accept(t, res) => {
                    assert_eq!(t, self.listener);
                    let (stream, _) = res.unwrap();
                    let stream = Rc::new(stream);
                    let rd = reactor.add_readable(stream.clone());
                    let wr = reactor.add_writable(stream.clone());
                    self.streams.push((rd, wr, stream));
                }
                Event::Readable(t) => {
                    let (_, wr, stream) = self.streams.iter().find(|s| s.0 == t).unwrap();
                    let mut buf = [0u8; 64];
                    if let Ok(n) = stream.try_read(&mut buf) {
                        self.got.extend_from_slice(&buf[..n]);
                        reactor.arm(*wr);
                    }
                }
                Event::Writable(t) => {
                    let (_, _, stream) = self.streams.iter().find(|s| s.1 == t).unwrap();
                    stream.try_write(b"ok\n").unwrap();
                    reactor.disarm(t);
                    self.wrote = true;
                }
                Event::Timer(_) => {}
            }
        }
    }

    #[tokio::test]
    async fn accepts_reads_and_writes_one_event_per_pass() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut r = Reactor::new(Duration::from_secs(1));
        let mut h = Echo {
            listener: r.add_listener(listener),
            streams: Vec::new(),
            got: Vec::new(),
            wrote: false,
        };

        let mut client = TcpStream::connect(addr).await.unwrap();
        r.dispatch(&mut h).await.unwrap();
        assert_eq!(h.streams.len(), 1);
        assert_eq!(r.len(), 3);

        client.write_all(b"look\n").await.unwrap();
        while h.got.len() < 5 {
            r.dispatch(&mut h).await.unwrap();
        }
        assert_eq!(&h.got[..], b"look\n");
        assert!(!h.wrote);

        while !h.wrote {
            r.dispatch(&mut h).await.unwrap();
        }
        let mut buf = [0u8; 3];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ok\n");
        assert!(!r.is_armed(h.streams[0].1));
    }

    #[tokio::test]
    async fn ready_sources_take_turns() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut c1 = TcpStream::connect(addr).await.unwrap();
        let (s1, _) = listener.accept().await.unwrap();
        let mut c2 = TcpStream::connect(addr).await.unwrap();
        let (s2, _) = listener.accept().await.unwrap();

        let mut r = Reactor::new(Duration::from_secs(1));
        let t1 = r.add_readable(Rc::new(s1));
        let t2 = r.add_readable(Rc::new(s2));
        c1.write_all(b"a\n").await.unwrap();
        c2.write_all(b"b\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Nobody reads, so both stay ready; each pass services exactly one.
        let mut h = Recorder::default();
        r.dispatch(&mut h).await.unwrap();
        assert_eq!(h.reads.len(), 1);
        r.dispatch(&mut h).await.unwrap();
        assert_eq!(h.reads.len(), 2);
        assert!(h.reads.contains(&t1));
        assert!(h.reads.contains(&t2));
    }
}
