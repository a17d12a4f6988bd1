//! The LED engine: object arena, active registry, lock and poll routine.
//!
//! [`LedEngine`] replaces a global list plus global mutex with one explicit
//! context. Every operation takes the engine's lock for its whole duration,
//! so `process` may run from a timer task while other contexts create,
//! start, stop and reconfigure LEDs.

use crate::command::{LedAction, LedCommand};
use crate::led::{ChangeCallback, CompleteCallback, Led, LedPin, LedStatus};
use crate::pattern::Pattern;
use crate::time::TimeSource;
use crate::types::{LedError, LedId, Level, LoopCount};
use core::cell::{Cell, RefCell};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use heapless::Vec;

static NEXT_ENGINE_TAG: Mutex<CriticalSectionRawMutex, Cell<u32>> = Mutex::new(Cell::new(0));

fn next_engine_tag() -> u32 {
    NEXT_ENGINE_TAG.lock(|next| {
        let tag = next.get();
        next.set(tag.wrapping_add(1));
        tag
    })
}

fn parse_optional<'a, const N: usize>(light_mode: Option<&str>) -> Result<Option<Pattern<'a, N>>, LedError> {
    light_mode.map(Pattern::parse).transpose()
}

/// Callback work collected under the lock and run after releasing it.
#[derive(Clone, Copy)]
enum Notification {
    Changed(LedId, bool, ChangeCallback),
    Completed(LedId, CompleteCallback),
}

impl Notification {
    fn deliver(self) {
        match self {
            Notification::Changed(id, lit, callback) => callback(id, lit),
            Notification::Completed(id, callback) => callback(id),
        }
    }
}

struct EngineState<'a, P: LedPin, const N: usize, const MAX_LEDS: usize, const PINS: usize> {
    tag: u32,
    initialized: bool,
    slots: [Option<Led<'a, P, N, PINS>>; MAX_LEDS],
    generations: [u32; MAX_LEDS],
    /// Slot indices of running LEDs, in start order.
    active: Vec<usize, MAX_LEDS>,
}

impl<'a, P: LedPin, const N: usize, const MAX_LEDS: usize, const PINS: usize>
    EngineState<'a, P, N, MAX_LEDS, PINS>
{
    fn new(tag: u32) -> Self {
        Self {
            tag,
            initialized: true,
            slots: core::array::from_fn(|_| None),
            generations: [0; MAX_LEDS],
            active: Vec::new(),
        }
    }

    fn issued(&self, id: LedId) -> bool {
        id.engine == self.tag && self.generations.get(id.index) == Some(&id.generation)
    }

    fn led(&self, id: LedId) -> Result<&Led<'a, P, N, PINS>, LedError> {
        match self.slots.get(id.index) {
            Some(Some(led)) if self.issued(id) => Ok(led),
            _ => Err(LedError::InvalidState),
        }
    }

    fn led_mut(&mut self, id: LedId) -> Result<&mut Led<'a, P, N, PINS>, LedError> {
        if !self.issued(id) {
            return Err(LedError::InvalidState);
        }
        self.slots
            .get_mut(id.index)
            .and_then(Option::as_mut)
            .ok_or(LedError::InvalidState)
    }

    fn insert(&mut self, led: Led<'a, P, N, PINS>) -> Result<LedId, LedError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(LedError::OutOfMemory)?;

        self.slots[index] = Some(led);
        Ok(self.id_at(index))
    }

    fn remove(&mut self, id: LedId) -> Result<Led<'a, P, N, PINS>, LedError> {
        self.deactivate(id)?;
        let led = self.slots[id.index].take().ok_or(LedError::InvalidState)?;
        self.generations[id.index] = self.generations[id.index].wrapping_add(1);
        Ok(led)
    }

    /// Removes an LED from the registry. Returns false if it was not running.
    fn deactivate(&mut self, id: LedId) -> Result<bool, LedError> {
        let led = self.led_mut(id)?;
        if !led.active {
            return Ok(false);
        }
        led.active = false;

        if let Some(pos) = self.active.iter().position(|&index| index == id.index) {
            self.active.remove(pos);
        }
        Ok(true)
    }

    fn id_at(&self, index: usize) -> LedId {
        LedId {
            engine: self.tag,
            index,
            generation: self.generations[index],
        }
    }

    /// One pass of the poll routine over every running LED.
    fn advance<T: TimeSource + ?Sized>(
        &mut self,
        time_source: &T,
        notifications: &mut Vec<Notification, MAX_LEDS>,
    ) {
        let now = time_source.now();
        let mut pos = 0;

        // Each running LED either completes or writes at most one level per
        // pass, so `notifications` cannot overflow.
        while pos < self.active.len() {
            let index = self.active[pos];
            let id = self.id_at(index);
            let Some(led) = self.slots[index].as_mut() else {
                self.active.remove(pos);
                continue;
            };

            if led.is_exhausted() {
                led.active = false;
                let on_complete = led.on_complete;
                self.active.remove(pos);
                debug!("{:?} completed", id);
                if let Some(callback) = on_complete {
                    let _ = notifications.push(Notification::Completed(id, callback));
                }
                // the next LED has shifted into `pos`
                continue;
            }

            if let Some(lit) = led.advance(now, time_source) {
                trace!("{:?} lit: {:?}", id, lit);
                if let Some(callback) = led.on_change {
                    let _ = notifications.push(Notification::Changed(id, lit, callback));
                }
            }
            pos += 1;
        }
    }
}

/// Drives any number of LEDs through blink patterns from one poll routine.
///
/// LED objects live in a fixed arena of `MAX_LEDS` slots. Each holds its
/// pattern either in an owned buffer of up to `N` entries ([`create`]) or as
/// a slice borrowed for `'a` ([`create_static`]), and drives a group of up to
/// `PINS` pins ([`add_pin`]).
///
/// Every engine tags the handles it issues; handles from another engine are
/// rejected with `InvalidState`.
///
/// # Type Parameters
/// * `'a` - Lifetime of the time source and of borrowed patterns
/// * `M` - Raw mutex guarding the engine state
/// * `P` - Pin implementation type (same for all LEDs in the engine)
/// * `T` - Time source implementation type
/// * `N` - Maximum number of entries in an owned pattern
/// * `MAX_LEDS` - Maximum number of LED objects
/// * `PINS` - Maximum number of pins per LED object
///
/// [`create`]: LedEngine::create
/// [`create_static`]: LedEngine::create_static
/// [`add_pin`]: LedEngine::add_pin
pub struct LedEngine<
    'a,
    M: RawMutex,
    P: LedPin,
    T: TimeSource,
    const N: usize,
    const MAX_LEDS: usize,
    const PINS: usize,
> {
    state: Mutex<M, RefCell<EngineState<'a, P, N, MAX_LEDS, PINS>>>,
    time_source: &'a T,
}

impl<'a, M, P, T, const N: usize, const MAX_LEDS: usize, const PINS: usize>
    LedEngine<'a, M, P, T, N, MAX_LEDS, PINS>
where
    M: RawMutex,
    P: LedPin,
    T: TimeSource,
{
    /// Creates an initialized engine with no LED objects.
    pub fn new(time_source: &'a T) -> Self {
        Self {
            state: Mutex::new(RefCell::new(EngineState::new(next_engine_tag()))),
            time_source,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut EngineState<'a, P, N, MAX_LEDS, PINS>) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Re-enables an engine after [`shutdown`](Self::shutdown). Does nothing
    /// on an initialized engine.
    pub fn init(&self) {
        self.with_state(|state| {
            if !state.initialized {
                state.initialized = true;
                debug!("engine initialized");
            }
        });
    }

    /// Stops every running LED and refuses new objects and starts until
    /// [`init`](Self::init) is called.
    ///
    /// Existing objects can still be stopped, reconfigured and deleted.
    pub fn shutdown(&self) {
        self.with_state(|state| {
            for &index in state.active.iter() {
                if let Some(led) = state.slots[index].as_mut() {
                    led.active = false;
                }
            }
            state.active.clear();
            state.initialized = false;
            debug!("engine shut down");
        });
    }

    /// Returns true unless the engine is shut down.
    pub fn is_initialized(&self) -> bool {
        self.with_state(|state| state.initialized)
    }

    /// Creates an LED whose pattern is parsed from text and owned by the object.
    ///
    /// The pin is configured as output and driven off. The LED starts
    /// inactive; `light_mode` may be `None` and set later.
    ///
    /// # Errors
    /// * `NotInitialized` - The engine is shut down
    /// * `InvalidPattern` - `light_mode` has no elements
    /// * `OutOfMemory` - `light_mode` has more than `N` elements, all slots are
    ///   taken, or `PINS` is 0
    pub fn create(
        &self,
        pin: P,
        active_logic: Level,
        light_mode: Option<&str>,
        loop_count: LoopCount,
    ) -> Result<LedId, LedError> {
        self.insert(Some((pin, active_logic)), || parse_optional(light_mode), loop_count)
    }

    /// Creates an LED with a parsed pattern and no pins yet.
    ///
    /// Pins join the group through [`add_pin`](Self::add_pin). A running LED
    /// without pins still steps through its pattern and fires its callbacks.
    ///
    /// # Errors
    /// Same as [`create`](Self::create).
    pub fn create_group(&self, light_mode: Option<&str>, loop_count: LoopCount) -> Result<LedId, LedError> {
        self.insert(None, || parse_optional(light_mode), loop_count)
    }

    /// Creates an LED running caller-owned durations.
    ///
    /// The slice is borrowed, never copied. An empty slice is accepted but
    /// the LED cannot be started until it gets a non-empty pattern.
    ///
    /// # Errors
    /// * `NotInitialized` - The engine is shut down
    /// * `OutOfMemory` - All slots are taken, or `PINS` is 0
    pub fn create_static(
        &self,
        pin: P,
        active_logic: Level,
        light_arr: &'a [u32],
        loop_count: LoopCount,
    ) -> Result<LedId, LedError> {
        self.insert(
            Some((pin, active_logic)),
            || Ok(Some(Pattern::borrowed(light_arr))),
            loop_count,
        )
    }

    fn insert(
        &self,
        pin: Option<(P, Level)>,
        pattern: impl FnOnce() -> Result<Option<Pattern<'a, N>>, LedError>,
        loop_count: LoopCount,
    ) -> Result<LedId, LedError> {
        self.with_state(|state| {
            if !state.initialized {
                error!("engine used before init");
                return Err(LedError::NotInitialized);
            }
            // checked before the pin is touched
            if state.slots.iter().all(Option::is_some) {
                return Err(LedError::OutOfMemory);
            }

            let pattern = pattern().inspect_err(|err| {
                warn!("rejected light mode: {:?}", err);
            })?;
            let mut led = Led::new(pattern, loop_count, self.time_source.now());
            if let Some((pin, active_logic)) = pin {
                led.add_pin(pin, active_logic)?;
            }

            let id = state.insert(led)?;
            debug!("{:?} created", id);
            Ok(id)
        })
    }

    /// Deletes an LED, dropping its pattern and returning its pins in group
    /// order.
    ///
    /// A running LED is stopped first. The handle is invalid afterwards.
    pub fn delete(&self, id: LedId) -> Result<Vec<P, PINS>, LedError> {
        let led = self.with_state(|state| state.remove(id))?;
        debug!("{:?} deleted", id);
        Ok(led.into_pins())
    }

    /// Adds a pin to the LED's group and returns its position in the group.
    ///
    /// The pin is configured as output and driven to the LED's current state,
    /// so it joins a running pattern in step.
    ///
    /// # Errors
    /// * `InvalidState` - Stale or foreign handle
    /// * `OutOfMemory` - The group already holds `PINS` pins; the pin is
    ///   dropped untouched
    pub fn add_pin(&self, id: LedId, pin: P, active_logic: Level) -> Result<usize, LedError> {
        self.with_state(|state| {
            let index = state.led_mut(id)?.add_pin(pin, active_logic)?;
            debug!("{:?} pin {} added", id, index);
            Ok(index)
        })
    }

    /// Removes the pin at `index` from the LED's group and returns it.
    ///
    /// The pin keeps its current level. Pins after it move down one position.
    ///
    /// # Errors
    /// * `InvalidState` - Stale or foreign handle, or no pin at `index`
    pub fn del_pin(&self, id: LedId, index: usize) -> Result<P, LedError> {
        self.with_state(|state| {
            let pin = state.led_mut(id)?.del_pin(index)?;
            debug!("{:?} pin {} removed", id, index);
            Ok(pin)
        })
    }

    /// Starts the pattern from its first step.
    ///
    /// # Errors
    /// * `NotInitialized` - The engine is shut down
    /// * `AlreadyActive` - The LED is running; its progress is left untouched
    /// * `NoPattern` - The LED has no pattern or an empty one
    pub fn start(&self, id: LedId) -> Result<(), LedError> {
        let now = self.time_source.now();
        self.with_state(|state| {
            if !state.initialized {
                return Err(LedError::NotInitialized);
            }
            let led = state.led_mut(id)?;
            if led.active {
                return Err(LedError::AlreadyActive);
            }
            if !led.has_pattern() {
                return Err(LedError::NoPattern);
            }

            led.rewind(now);
            state.active.push(id.index).map_err(|_| LedError::OutOfMemory)?;
            // only set once registered, so a failed push leaves the LED idle
            if let Some(led) = state.slots[id.index].as_mut() {
                led.active = true;
            }
            debug!("{:?} started", id);
            Ok(())
        })
    }

    /// Stops the LED. Stopping an idle LED succeeds without effect.
    ///
    /// The pin keeps its current level.
    pub fn stop(&self, id: LedId) -> Result<(), LedError> {
        self.with_state(|state| {
            if state.deactivate(id)? {
                debug!("{:?} stopped", id);
            }
            Ok(())
        })
    }

    /// Replaces the pattern with one parsed from text and sets the loop count.
    ///
    /// `None` keeps the current pattern. Either way the LED restarts from the
    /// first step of the first loop, without changing whether it is running.
    ///
    /// # Errors
    /// * `InvalidPattern` / `OutOfMemory` - `light_mode` failed to parse. The
    ///   LED is stopped and keeps its previous pattern.
    pub fn set_light_mode(
        &self,
        id: LedId,
        light_mode: Option<&str>,
        loop_count: LoopCount,
    ) -> Result<(), LedError> {
        let now = self.time_source.now();
        self.with_state(|state| {
            state.led(id)?;
            let pattern = match light_mode.map(Pattern::parse).transpose() {
                Ok(pattern) => pattern,
                Err(err) => {
                    warn!("{:?} rejected light mode: {:?}", id, err);
                    state.deactivate(id)?;
                    return Err(err);
                }
            };
            state.led_mut(id)?.reconfigure(pattern, loop_count, now);
            Ok(())
        })
    }

    /// Replaces the pattern with caller-owned durations and sets the loop count.
    ///
    /// Takes effect on the next poll without a stop/start cycle. An owned
    /// pattern being replaced is dropped.
    ///
    /// # Errors
    /// * `InvalidPattern` - `light_arr` is empty. The LED is stopped and keeps
    ///   its previous pattern.
    pub fn set_light_array(
        &self,
        id: LedId,
        light_arr: &'a [u32],
        loop_count: LoopCount,
    ) -> Result<(), LedError> {
        let now = self.time_source.now();
        self.with_state(|state| {
            state.led(id)?;
            if light_arr.is_empty() {
                state.deactivate(id)?;
                return Err(LedError::InvalidPattern);
            }
            state
                .led_mut(id)?
                .reconfigure(Some(Pattern::borrowed(light_arr)), loop_count, now);
            Ok(())
        })
    }

    /// Sets the callback invoked when the LED finishes its last loop.
    ///
    /// The callback runs after the engine lock is released and may call back
    /// into the engine, e.g. to restart the LED.
    pub fn set_complete_callback(
        &self,
        id: LedId,
        callback: Option<CompleteCallback>,
    ) -> Result<(), LedError> {
        self.with_state(|state| {
            state.led_mut(id)?.on_complete = callback;
            Ok(())
        })
    }

    /// Sets the callback invoked with the logical state every time the engine
    /// drives the LED's pins, from a pattern step or a manual write.
    pub fn set_change_callback(
        &self,
        id: LedId,
        callback: Option<ChangeCallback>,
    ) -> Result<(), LedError> {
        self.with_state(|state| {
            state.led_mut(id)?.on_change = callback;
            Ok(())
        })
    }

    /// Turns the LED on, outside of any pattern.
    pub fn on(&self, id: LedId) -> Result<(), LedError> {
        self.write_manual(id, |led| led.on())
    }

    /// Turns the LED off, outside of any pattern.
    pub fn off(&self, id: LedId) -> Result<(), LedError> {
        self.write_manual(id, |led| led.off())
    }

    /// Inverts every pin from the level it reads back, outside of any pattern.
    pub fn toggle(&self, id: LedId) -> Result<(), LedError> {
        self.write_manual(id, |led| led.toggle())
    }

    fn write_manual(
        &self,
        id: LedId,
        write: impl FnOnce(&mut Led<'a, P, N, PINS>) -> bool,
    ) -> Result<(), LedError> {
        let changed = self.with_state(|state| {
            let led = state.led_mut(id)?;
            let lit = write(&mut *led);
            Ok::<_, LedError>(led.on_change.map(|callback| Notification::Changed(id, lit, callback)))
        })?;

        if let Some(notification) = changed {
            notification.deliver();
        }
        Ok(())
    }

    /// Advances every running LED. Call periodically, e.g. every 5 ms.
    ///
    /// Blink timing resolution equals the call interval. Completion and
    /// level-change callbacks run after the lock is released, in registry order.
    pub fn process(&self) {
        let mut notifications: Vec<Notification, MAX_LEDS> = Vec::new();
        self.with_state(|state| state.advance(self.time_source, &mut notifications));

        for notification in notifications {
            notification.deliver();
        }
    }

    /// Routes a command to the targeted LED.
    pub fn handle_command(&self, command: LedCommand<'_>) -> Result<(), LedError> {
        let id = command.led_id;
        match command.action {
            LedAction::Start => self.start(id),
            LedAction::Stop => self.stop(id),
            LedAction::SetLightMode {
                light_mode,
                loop_count,
            } => self.set_light_mode(id, Some(light_mode), loop_count),
            LedAction::On => self.on(id),
            LedAction::Off => self.off(id),
            LedAction::Toggle => self.toggle(id),
        }
    }

    /// Returns a snapshot of the LED's scheduling state.
    pub fn status(&self, id: LedId) -> Result<LedStatus, LedError> {
        self.with_state(|state| state.led(id).map(Led::status))
    }

    /// Returns true if the LED is in the active registry.
    pub fn is_active(&self, id: LedId) -> Result<bool, LedError> {
        self.with_state(|state| state.led(id).map(|led| led.active))
    }

    /// Returns true if the handle refers to a live LED object.
    pub fn contains(&self, id: LedId) -> bool {
        self.with_state(|state| state.led(id).is_ok())
    }

    /// Returns the number of LED objects.
    pub fn len(&self) -> usize {
        self.with_state(|state| state.slots.iter().filter(|s| s.is_some()).count())
    }

    /// Returns true if the engine holds no LED objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of running LEDs.
    pub fn active_count(&self) -> usize {
        self.with_state(|state| state.active.len())
    }
}
