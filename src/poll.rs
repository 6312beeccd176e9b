use std::time::{Duration, Instant};

use crossbeam_channel::{after, select, Receiver};

pub enum LoopEvent<E> {
    Input(E),
    Tick,
}

/// The one periodic timer of the UI, multiplexed with terminal input.
///
/// A tick re-arms the timer the next time the loop asks for an event, i.e.
/// once the tick has been fully handled, whatever the handler did.
pub struct PollDriver {
    interval: Duration,
    deadline: Instant,
    armed: bool,
}

impl PollDriver {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Instant::now() + interval,
            armed: true,
        }
    }

    /// Makes the next tick due immediately.
    pub fn fire_now(&mut self) {
        self.deadline = Instant::now();
        self.armed = true;
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn rearm(&mut self) {
        self.deadline = Instant::now() + self.interval;
        self.armed = true;
    }

    /// Blocks until input arrives or the timer fires. `None` once the input
    /// channel is closed.
    pub fn next_event<E>(&mut self, events: &Receiver<E>) -> Option<LoopEvent<E>> {
        if !self.armed {
            self.rearm();
        }
        select! {
            recv(events) -> event => event.ok().map(LoopEvent::Input),
            recv(after(self.remaining())) -> _ => {
                self.armed = false;
                Some(LoopEvent::Tick)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn ticks_when_no_input_arrives() {
        let (_tx, rx) = unbounded::<char>();
        let mut driver = PollDriver::new(Duration::from_millis(10));
        assert!(matches!(driver.next_event(&rx), Some(LoopEvent::Tick)));
        assert!(matches!(driver.next_event(&rx), Some(LoopEvent::Tick)));
    }

    #[test]
    fn input_is_delivered_before_a_distant_tick() {
        let (tx, rx) = unbounded();
        let mut driver = PollDriver::new(Duration::from_secs(60));
        tx.send('x').unwrap();
        assert!(matches!(driver.next_event(&rx), Some(LoopEvent::Input('x'))));
        assert!(driver.remaining() > Duration::from_secs(30));
    }

    #[test]
    fn tick_rearms_a_full_interval() {
        let (tx, rx) = unbounded();
        let mut driver = PollDriver::new(Duration::from_secs(60));
        driver.fire_now();
        assert_eq!(driver.remaining(), Duration::ZERO);
        assert!(matches!(driver.next_event(&rx), Some(LoopEvent::Tick)));

        tx.send('k').unwrap();
        assert!(matches!(driver.next_event(&rx), Some(LoopEvent::Input('k'))));
        assert!(driver.remaining() > Duration::from_secs(30));
    }

    #[test]
    fn closed_input_channel_ends_the_loop() {
        let (tx, rx) = unbounded::<char>();
        drop(tx);
        let mut driver = PollDriver::new(Duration::from_secs(60));
        assert!(driver.next_event(&rx).is_none());
    }
}
