//! calloop integration.
//!
//! The seat itself is loop-agnostic: it exposes a pollable fd, a
//! [`Seat::dispatch`] entry point and pending repeat-timer operations.
//! [`SeatDispatcher`] wires those onto a calloop event loop: a level-
//! triggered read source on the fd, and a timer source driving key
//! auto-repeat, re-armed from the operations the seat queues.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::os::unix::io::BorrowedFd;
use std::rc::Rc;
use std::time::Duration;

use calloop::generic::Generic;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{Interest, LoopHandle, Mode, PostAction, RegistrationToken};
use tracing::warn;

use crate::event::Event;
use crate::seat::{RepeatTimerOp, Seat};
use crate::utils::Clock;

type EventCallback<D> = Rc<RefCell<dyn FnMut(Event, &mut D)>>;

/// Drives a [`Seat`] from a calloop event loop.
///
/// Translated events are handed to the callback; the seat stays reachable
/// through [`SeatDispatcher::seat`] for configuration and event injection.
/// After injecting events from outside the loop (virtual devices), call
/// [`SeatDispatcher::flush`] so queued events and repeat-timer changes are
/// applied.
pub struct SeatDispatcher<D> {
    seat: Rc<RefCell<Seat>>,
    handle: LoopHandle<'static, D>,
    callback: EventCallback<D>,
    io_token: RegistrationToken,
    timer_token: Rc<Cell<Option<RegistrationToken>>>,
    clock: Clock,
}

impl<D> fmt::Debug for SeatDispatcher<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeatDispatcher")
            .field("seat", &self.seat)
            .field("io_token", &self.io_token)
            .finish()
    }
}

impl<D: 'static> SeatDispatcher<D> {
    /// Register a seat on the event loop.
    pub fn insert<F>(
        handle: LoopHandle<'static, D>,
        seat: Seat,
        callback: F,
    ) -> Result<SeatDispatcher<D>, calloop::Error>
    where
        F: FnMut(Event, &mut D) + 'static,
    {
        let seat = Rc::new(RefCell::new(seat));
        let callback: EventCallback<D> = Rc::new(RefCell::new(callback));
        let timer_token: Rc<Cell<Option<RegistrationToken>>> = Rc::new(Cell::new(None));
        let clock = Clock::new();

        let fd = seat.borrow().source_fd();
        // the seat keeps the source (and its fd) alive for as long as this
        // dispatcher is registered
        let io_source = Generic::new(
            unsafe { BorrowedFd::borrow_raw(fd) },
            Interest::READ,
            Mode::Level,
        );

        let io_token = {
            let seat = seat.clone();
            let callback = callback.clone();
            let timer_token = timer_token.clone();
            let handle = handle.clone();
            handle
                .clone()
                .insert_source(io_source, move |_, _, data| {
                    // don't pull more events while a previous batch is
                    // still unflushed; the fd is level-triggered and will
                    // wake us again
                    let backlog = seat.borrow().pending_events() > 0;
                    if !backlog {
                        if let Err(err) = seat.borrow_mut().dispatch() {
                            warn!("event source dispatch failed: {err}");
                        }
                    }
                    flush_events(&seat, &callback, data);
                    sync_repeat_timer(&handle, &seat, &callback, &timer_token, clock);
                    Ok(PostAction::Continue)
                })
                .map_err(Into::<calloop::Error>::into)?
        };

        Ok(SeatDispatcher {
            seat,
            handle,
            callback,
            io_token,
            timer_token,
            clock,
        })
    }

    /// Shared handle to the seat.
    pub fn seat(&self) -> Rc<RefCell<Seat>> {
        self.seat.clone()
    }

    /// Deliver queued events and apply pending repeat-timer operations.
    pub fn flush(&self, data: &mut D) {
        flush_events(&self.seat, &self.callback, data);
        sync_repeat_timer(
            &self.handle,
            &self.seat,
            &self.callback,
            &self.timer_token,
            self.clock,
        );
    }

    /// Unregister from the event loop. The seat survives in its shared
    /// handle.
    pub fn detach(self) {
        self.handle.remove(self.io_token);
        if let Some(token) = self.timer_token.take() {
            self.handle.remove(token);
        }
    }
}

fn flush_events<D>(seat: &Rc<RefCell<Seat>>, callback: &EventCallback<D>, data: &mut D) {
    // never hold the seat borrow across the callback, it may reach back in
    loop {
        let event = seat.borrow_mut().pop_event();
        let Some(event) = event else { break };
        let mut callback = callback.borrow_mut();
        (&mut *callback)(event, data);
    }
}

fn sync_repeat_timer<D: 'static>(
    handle: &LoopHandle<'static, D>,
    seat: &Rc<RefCell<Seat>>,
    callback: &EventCallback<D>,
    timer_token: &Rc<Cell<Option<RegistrationToken>>>,
    clock: Clock,
) {
    let op = seat.borrow_mut().take_repeat_timer_op();
    match op {
        None => {}
        Some(RepeatTimerOp::Cancel) => {
            if let Some(token) = timer_token.take() {
                handle.remove(token);
            }
        }
        Some(RepeatTimerOp::Arm(delay)) => {
            if let Some(token) = timer_token.take() {
                handle.remove(token);
            }

            let timer = Timer::from_duration(delay);
            let seat = seat.clone();
            let callback = callback.clone();
            let token_slot = timer_token.clone();
            let inserted = handle.insert_source(timer, move |_, _, data| {
                let keep = seat.borrow_mut().dispatch_key_repeat(clock.now_us());
                let (op, interval) = {
                    let mut seat = seat.borrow_mut();
                    (seat.take_repeat_timer_op(), seat.repeat_interval())
                };
                flush_events(&seat, &callback, data);

                match op {
                    Some(RepeatTimerOp::Arm(next)) => TimeoutAction::ToDuration(next),
                    Some(RepeatTimerOp::Cancel) => {
                        token_slot.set(None);
                        TimeoutAction::Drop
                    }
                    None if keep => {
                        TimeoutAction::ToDuration(Duration::from_millis(u64::from(interval)))
                    }
                    None => {
                        token_slot.set(None);
                        TimeoutAction::Drop
                    }
                }
            });

            match inserted {
                Ok(token) => timer_token.set(Some(token)),
                Err(err) => warn!("failed to arm the key repeat timer: {err}"),
            }
        }
    }
}
