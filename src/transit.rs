// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The root instance, which wires bindings, slots, selection and the crossfade
//! together and runs them once per host evaluation.
//!
//! Neighbors are only borrowed for the duration of a [Session]. The host
//! attaches the current chain, runs `evaluate` or any slot operation on the
//! session, and drops it again, so nothing in here ever holds a reference to
//! another instance.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info, span, trace, Level, Span};

use crate::bindings::{Bindings, ReleaseDrain};
use crate::chain::{Neighbor, SlotSpace};
use crate::command::{Command, CommandSender};
use crate::config::TransitConfig;
use crate::crossfade::{Crossfade, OutMode, Outputs, Step};
use crate::document::{Document, SourceMap};
use crate::dsp::{ClockDivider, SchmittTrigger, Timer};
use crate::error::TransitError;
use crate::registry::{IdRemapper, ParamRef, ParameterRegistry};
use crate::selection::{Selection, SlotCvMode};
use crate::slots::{Slot, SlotBank};
use crate::status::{LightState, StatusBoard, StatusReader};

/// Manual rise time after a reset, in seconds.
const DEFAULT_FADE: f32 = 0.5;

/// Duration class of a slot button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Press {
    Short,
    Long,
}

/// A debounced press on the button of a logical slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    pub slot: usize,
    pub press: Press,
}

impl ButtonEvent {
    pub fn short(slot: usize) -> ButtonEvent {
        ButtonEvent {
            slot,
            press: Press::Short,
        }
    }

    pub fn long(slot: usize) -> ButtonEvent {
        ButtonEvent {
            slot,
            press: Press::Long,
        }
    }
}

/// Inputs for one evaluation. Unconnected inputs are `None`.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'b> {
    pub sample_time: f32,
    pub sample_rate: f32,
    pub slot_cv: Option<f32>,
    pub reset_cv: Option<f32>,
    pub fade_cv: Option<f32>,
    pub buttons: &'b [ButtonEvent],
}

impl Frame<'static> {
    pub fn new(sample_rate: f32) -> Frame<'static> {
        Frame {
            sample_time: 1.0 / sample_rate,
            sample_rate,
            slot_cv: None,
            reset_cv: None,
            fade_cv: None,
            buttons: &[],
        }
    }
}

impl<'b> Frame<'b> {
    pub fn with_slot_cv(self, voltage: f32) -> Frame<'b> {
        Frame {
            slot_cv: Some(voltage),
            ..self
        }
    }

    pub fn with_reset_cv(self, voltage: f32) -> Frame<'b> {
        Frame {
            reset_cv: Some(voltage),
            ..self
        }
    }

    pub fn with_fade_cv(self, voltage: f32) -> Frame<'b> {
        Frame {
            fade_cv: Some(voltage),
            ..self
        }
    }

    pub fn with_buttons<'c>(self, buttons: &'c [ButtonEvent]) -> Frame<'c> {
        Frame {
            sample_time: self.sample_time,
            sample_rate: self.sample_rate,
            slot_cv: self.slot_cv,
            reset_cv: self.reset_cv,
            fade_cv: self.fade_cv,
            buttons,
        }
    }
}

/// Instance parameters that are not part of the selection.
#[derive(Clone, Copy, Debug)]
struct Params {
    write_mode: bool,
    /// Manual rise time in seconds.
    fade: f32,
    shape: f32,
    panel_theme: i64,
    indicator_hidden: bool,
    out_mode: OutMode,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            write_mode: false,
            fade: DEFAULT_FADE,
            shape: 0.0,
            panel_theme: 0,
            indicator_hidden: false,
            out_mode: OutMode::default(),
        }
    }
}

/// Everything a root owns apart from its slots.
struct Engine {
    config: TransitConfig,
    params: Params,
    bindings: Bindings,
    selection: Selection,
    crossfade: Crossfade,
    outputs: Outputs,
    clipboard: Option<usize>,
    /// Copy buffer for pasting between slots that live in different instances.
    scratch: Vec<f32>,
    slot_trigger: SchmittTrigger,
    reset_trigger: SchmittTrigger,
    reset_timer: Timer,
    process_divider: ClockDivider,
    handle_divider: ClockDivider,
    light_divider: ClockDivider,
    status: StatusBoard,
    commands: Receiver<Command>,
    sender: Sender<Command>,
}

impl Engine {
    fn set_process_division(&mut self, division: u32) {
        self.process_divider.set_division(division);
        self.process_divider.reset();
    }

    fn set_fade(&mut self, fade: f32) {
        self.params.fade = fade.max(0.0);
    }

    fn set_shape(&mut self, shape: f32) {
        self.params.shape = shape.clamp(-1.0, 1.0);
    }
}

/// A root instance.
pub struct Transit {
    id: i64,
    engine: Engine,
    bank: SlotBank,
    span: Span,
}

impl Transit {
    /// Creates a root with the given host id. The returned [ReleaseDrain] must
    /// be drained periodically from a non-real-time context.
    pub fn new(
        config: TransitConfig,
        registry: Arc<dyn ParameterRegistry>,
        id: i64,
    ) -> (Transit, ReleaseDrain) {
        Transit::with_seed(config, registry, id, None)
    }

    /// Like [Transit::new], with a fixed seed for the random policies.
    pub fn with_seed(
        config: TransitConfig,
        registry: Arc<dyn ParameterRegistry>,
        id: i64,
        seed: Option<u64>,
    ) -> (Transit, ReleaseDrain) {
        let slot_count = config.slot_count();
        let (bindings, drain) = Bindings::new(registry, config.release_queue_capacity());
        let (sender, commands) = bounded(config.command_queue_capacity());
        let engine = Engine {
            params: Params::default(),
            bindings,
            selection: Selection::new(slot_count, seed),
            crossfade: Crossfade::new(config.pulse_duration()),
            outputs: Outputs::default(),
            clipboard: None,
            scratch: Vec::new(),
            slot_trigger: SchmittTrigger::default(),
            reset_trigger: SchmittTrigger::default(),
            reset_timer: Timer::default(),
            process_divider: ClockDivider::new(config.process_division()),
            handle_divider: ClockDivider::new(config.handle_division()),
            light_divider: ClockDivider::new(config.light_division()),
            status: StatusBoard::new(slot_count),
            commands,
            sender,
            config,
        };
        (
            Transit {
                id,
                engine,
                bank: SlotBank::new(slot_count),
                span: span!(Level::INFO, "transit", id),
            },
            drain,
        )
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn config(&self) -> &TransitConfig {
        &self.engine.config
    }

    /// Borrows the chain to the right of this instance for one round of work.
    pub fn attach<'a>(&'a mut self, neighbors: &'a mut [&mut dyn Neighbor]) -> Session<'a> {
        let Transit {
            id,
            engine,
            bank,
            span,
        } = self;
        let space = SlotSpace::walk(
            bank,
            neighbors,
            *id,
            engine.params.write_mode,
            engine.params.panel_theme,
        );
        engine.selection.set_total(space.total());
        Session {
            id: *id,
            engine,
            space,
            span,
        }
    }

    /// A session without any chain.
    pub fn session(&mut self) -> Session<'_> {
        let Transit {
            id,
            engine,
            bank,
            span,
        } = self;
        let space = SlotSpace::standalone(bank);
        engine.selection.set_total(space.total());
        Session {
            id: *id,
            engine,
            space,
            span,
        }
    }

    /// Runs one evaluation with the given chain.
    pub fn evaluate(&mut self, frame: &Frame, neighbors: &mut [&mut dyn Neighbor]) -> Outputs {
        self.attach(neighbors).evaluate(frame)
    }

    pub fn command_sender(&self) -> CommandSender {
        CommandSender::new(self.engine.sender.clone())
    }

    pub fn status(&self) -> StatusReader {
        self.engine.status.reader()
    }

    /// Status output of the last crossfade step.
    pub fn outputs(&self) -> Outputs {
        self.engine.outputs
    }

    pub fn current(&self) -> Option<usize> {
        self.engine.selection.current()
    }

    pub fn armed(&self) -> Option<usize> {
        self.engine.selection.armed()
    }

    pub fn active_count(&self) -> usize {
        self.engine.selection.active_count()
    }

    pub fn is_fading(&self) -> bool {
        self.engine.crossfade.is_fading()
    }

    pub fn bindings(&self) -> &Bindings {
        &self.engine.bindings
    }

    /// The slots owned by this instance, without any links.
    pub fn bank(&self) -> &SlotBank {
        &self.bank
    }

    pub fn write_mode(&self) -> bool {
        self.engine.params.write_mode
    }

    pub fn set_write_mode(&mut self, write_mode: bool) {
        self.engine.params.write_mode = write_mode;
    }

    pub fn fade(&self) -> f32 {
        self.engine.params.fade
    }

    pub fn set_fade(&mut self, fade: f32) {
        self.engine.set_fade(fade);
    }

    pub fn shape(&self) -> f32 {
        self.engine.params.shape
    }

    pub fn set_shape(&mut self, shape: f32) {
        self.engine.set_shape(shape);
    }

    pub fn panel_theme(&self) -> i64 {
        self.engine.params.panel_theme
    }

    pub fn set_panel_theme(&mut self, theme: i64) {
        self.engine.params.panel_theme = theme;
    }

    pub fn mapping_indicator_hidden(&self) -> bool {
        self.engine.params.indicator_hidden
    }

    pub fn set_mapping_indicator_hidden(&mut self, hidden: bool) {
        self.engine.params.indicator_hidden = hidden;
    }

    pub fn process_division(&self) -> u32 {
        self.engine.process_divider.division()
    }

    pub fn set_process_division(&mut self, division: u32) {
        self.engine.set_process_division(division);
    }

    pub fn slot_cv_mode(&self) -> SlotCvMode {
        self.engine.selection.mode()
    }

    pub fn set_slot_cv_mode(&mut self, mode: SlotCvMode) {
        self.engine.selection.set_mode(mode);
    }

    pub fn out_mode(&self) -> OutMode {
        self.engine.params.out_mode
    }

    pub fn set_out_mode(&mut self, mode: OutMode) {
        self.engine.params.out_mode = mode;
    }

    /// Captures the persisted state of this instance.
    pub fn to_document(&self) -> Document {
        let engine = &self.engine;
        Document {
            panel_theme: engine.params.panel_theme,
            mapping_indicator_hidden: engine.params.indicator_hidden,
            process_division: i64::from(engine.process_divider.division()),
            slot_cv_mode: engine.selection.mode().persisted(),
            out_mode: engine.params.out_mode.persisted(),
            current_slot: engine.selection.current().map_or(-1, |current| current as i64),
            active_count: engine.selection.active_count() as i64,
            source_maps: engine
                .bindings
                .iter()
                .map(|binding| SourceMap {
                    owner_id: if binding.is_live() {
                        binding.param().owner_id
                    } else {
                        -1
                    },
                    param_index: binding.param().param_index as i64,
                })
                .collect(),
            slots: self.bank.to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String, TransitError> {
        self.to_document().to_json()
    }

    /// Replaces the state of this instance with a persisted document.
    ///
    /// Owner ids pass through `remap`. When `remap` reports that this instance
    /// already exists in the host, nothing is loaded and false is returned.
    /// The instance always comes back in read mode.
    pub fn load_document(&mut self, document: &Document, remap: &dyn IdRemapper) -> bool {
        let _enter = self.span.enter();
        if remap.already_present() {
            info!("Instance already present, skipping document.");
            return false;
        }

        let slot_count = self.engine.config.slot_count();
        let engine = &mut self.engine;
        engine.params.panel_theme = document.panel_theme;
        engine.params.indicator_hidden = document.mapping_indicator_hidden;
        engine.params.out_mode = OutMode::from_persisted(document.out_mode);
        engine.params.write_mode = false;
        let division = u32::try_from(document.process_division)
            .ok()
            .filter(|&division| division > 0)
            .unwrap_or_else(|| engine.config.process_division());
        engine.set_process_division(division);

        let active_count = usize::try_from(document.active_count)
            .ok()
            .filter(|&count| count > 0)
            .unwrap_or(slot_count);
        engine.selection.restore(
            SlotCvMode::from_persisted(document.slot_cv_mode),
            usize::try_from(document.current_slot).ok(),
            active_count,
        );

        engine.bindings.clear();
        for source in &document.source_maps {
            let param_index = usize::try_from(source.param_index).unwrap_or(0);
            if source.owner_id >= 0 && source.param_index >= 0 {
                let owner_id = remap.remap(source.owner_id);
                engine.bindings.restore(ParamRef::new(owner_id, param_index));
            } else {
                engine
                    .bindings
                    .restore_released(ParamRef::new(source.owner_id, param_index));
            }
        }

        let columns = engine.bindings.len();
        self.bank.restore(&document.slots, columns);
        engine.crossfade.reset();
        engine.crossfade.reserve(columns);
        engine.clipboard = None;

        info!(
            columns,
            current = ?engine.selection.current(),
            active_count,
            "Loaded document."
        );
        true
    }

    /// Parses and loads a JSON document.
    pub fn load_json(&mut self, json: &str, remap: &dyn IdRemapper) -> Result<bool, TransitError> {
        let document = Document::from_json(json)?;
        Ok(self.load_document(&document, remap))
    }
}

/// A root together with its attached chain.
///
/// The session holds the root exclusively, so an evaluation can never run
/// while a bind, reset or document load is half done.
pub struct Session<'a> {
    id: i64,
    engine: &'a mut Engine,
    space: SlotSpace<'a>,
    span: &'a Span,
}

impl Session<'_> {
    /// Total addressable slots.
    pub fn total(&self) -> usize {
        self.space.total()
    }

    /// Number of confirmed links.
    pub fn links(&self) -> usize {
        self.space.links()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.space.get(index)
    }

    pub fn current(&self) -> Option<usize> {
        self.engine.selection.current()
    }

    /// Runs one evaluation: pending commands, inputs, buttons, the crossfade
    /// and the status lights. Never fails.
    pub fn evaluate(&mut self, frame: &Frame) -> Outputs {
        while let Ok(command) = self.engine.commands.try_recv() {
            self.apply(command);
        }

        let engine = &mut *self.engine;
        if engine.handle_divider.process() {
            engine
                .bindings
                .refresh_indicators(!engine.params.indicator_hidden);
            engine.bindings.retry_releases();
        }

        if self.engine.params.write_mode {
            for event in frame.buttons {
                let result = match event.press {
                    Press::Short => self.save(event.slot),
                    Press::Long => self.clear(event.slot),
                };
                ignored("button", result);
            }
        } else {
            self.read_inputs(frame);
            let arm = self.engine.selection.mode() == SlotCvMode::Arm;
            for event in frame.buttons {
                let result = match event.press {
                    Press::Short => self.load(event.slot, arm, true).map(|_| ()),
                    Press::Long => self.set_active_count(event.slot + 1),
                };
                ignored("button", result);
            }
        }

        self.process(frame);
        self.publish(frame);
        self.engine.outputs
    }

    fn read_inputs(&mut self, frame: &Frame) {
        let mode = self.engine.selection.mode();
        if mode.honors_reset() {
            if let Some(voltage) = frame.reset_cv {
                if self.engine.reset_trigger.process(voltage) {
                    self.engine.reset_timer.reset();
                    ignored("reset input", self.follow(0).map(|_| ()));
                }
            }
        }

        let Some(voltage) = frame.slot_cv else {
            return;
        };
        let engine = &mut *self.engine;
        if engine.reset_timer.process(frame.sample_time) < engine.config.reset_guard() {
            return;
        }
        let target = if mode.is_voltage() {
            engine.selection.by_voltage(voltage)
        } else if engine.slot_trigger.process(voltage) {
            engine.selection.on_trigger()
        } else {
            None
        };
        if let Some(target) = target {
            ignored("slot input", self.follow(target).map(|_| ()));
        }
    }

    /// Advances the crossfade and writes the blended values.
    fn process(&mut self, frame: &Frame) {
        let engine = &mut *self.engine;
        if !engine.process_divider.process() || engine.selection.current().is_none() {
            return;
        }

        let delta = frame.sample_time * engine.process_divider.division() as f32;
        let modulation = frame.fade_cv.unwrap_or(0.0) * engine.config.fade_cv_seconds_per_volt();
        let rise = (engine.params.fade + modulation).max(0.0);
        let (step, outputs) =
            engine
                .crossfade
                .advance(rise, engine.params.shape, delta, engine.params.out_mode);
        engine.outputs = outputs;

        match step {
            Step::Resting => {}
            Step::Fading(progress) => {
                for column in 0..engine.bindings.len() {
                    if let Some(value) = engine.crossfade.value(column, progress) {
                        engine.bindings.write(column, value);
                    }
                }
            }
            Step::Completed => {
                for column in 0..engine.bindings.len() {
                    if let Some(value) = engine.crossfade.target(column) {
                        engine.bindings.write(column, value);
                    }
                }
                trace!(slot = ?engine.selection.current(), "Crossfade complete.");
            }
        }
    }

    fn publish(&mut self, frame: &Frame) {
        let engine = &mut *self.engine;
        if !engine.light_divider.process() {
            return;
        }
        engine
            .status
            .tick(frame.sample_time * engine.light_divider.division() as f32);
        let state = LightState {
            current: engine.selection.current(),
            armed: engine.selection.armed(),
            count: engine.selection.count(),
            write_mode: engine.params.write_mode,
            blink: engine.status.blink(),
        };
        let space = &self.space;
        engine.status.publish(
            state,
            space.total(),
            |index| space.get(index).is_some_and(Slot::is_used),
            engine.bindings.len(),
            engine.outputs,
        );
    }

    /// Loads slot `index`, or arms it when `is_next` is set.
    ///
    /// Returns true when a fade started. Reloading the current slot does nothing
    /// unless `force` is set. Unused or inactive slots are rejected without
    /// touching the selection or the crossfade.
    pub fn load(&mut self, index: usize, is_next: bool, force: bool) -> Result<bool, TransitError> {
        let used = self.space.get(index).is_some_and(Slot::is_used);
        if !self.engine.selection.request(index, is_next, force, used)? {
            return Ok(false);
        }
        Ok(self.slot_changed(index))
    }

    /// Moves to a slot picked by the slot or reset input. An unused slot
    /// becomes current without a fade. Returns true when a fade started.
    fn follow(&mut self, index: usize) -> Result<bool, TransitError> {
        if !self.engine.selection.advance(index)? {
            return Ok(false);
        }
        Ok(self.slot_changed(index))
    }

    /// Pulses the slot output and fades towards `index` if it holds a snapshot.
    fn slot_changed(&mut self, index: usize) -> bool {
        let engine = &mut *self.engine;
        engine.crossfade.slot_changed();
        let Some(slot) = self.space.get(index).filter(|slot| slot.is_used()) else {
            debug!(slot = index, "Moved to an empty slot.");
            return false;
        };
        engine.crossfade.begin(engine.bindings.read_all(), slot.values());
        debug!(slot = index, "Loading slot.");
        true
    }

    /// Stores the current parameter values in slot `index` and makes it current.
    pub fn save(&mut self, index: usize) -> Result<(), TransitError> {
        let total = self.space.total();
        let slot = self
            .space
            .get_mut(index)
            .ok_or(TransitError::InvalidIndex {
                index,
                bound: total,
            })?;
        slot.store(self.engine.bindings.read_all());
        self.engine.selection.set_current(index);
        debug!(slot = index, "Saved slot.");
        Ok(())
    }

    /// Randomizes every bound parameter, then saves the result into slot `index`.
    pub fn randomize(&mut self, index: usize) -> Result<(), TransitError> {
        let total = self.space.total();
        if index >= total {
            return Err(TransitError::InvalidIndex {
                index,
                bound: total,
            });
        }
        for column in 0..self.engine.bindings.len() {
            self.engine.bindings.randomize(column);
        }
        self.save(index)
    }

    /// Empties slot `index`. If it was current, no slot is current afterwards.
    pub fn clear(&mut self, index: usize) -> Result<(), TransitError> {
        let total = self.space.total();
        self.space
            .get_mut(index)
            .ok_or(TransitError::InvalidIndex {
                index,
                bound: total,
            })?
            .clear();
        self.engine.selection.forget(index);
        debug!(slot = index, "Cleared slot.");
        Ok(())
    }

    /// Copies the values of `source` into `target`.
    ///
    /// An unused source is rejected. If `target` was current, no slot is
    /// current afterwards.
    pub fn copy_paste(&mut self, source: usize, target: usize) -> Result<(), TransitError> {
        let total = self.space.total();
        if target >= total {
            return Err(TransitError::InvalidIndex {
                index: target,
                bound: total,
            });
        }
        let from = self.space.get(source).ok_or(TransitError::InvalidIndex {
            index: source,
            bound: total,
        })?;
        if !from.is_used() {
            return Err(TransitError::EmptySlot(source));
        }

        let engine = &mut *self.engine;
        engine.scratch.clear();
        engine.scratch.extend_from_slice(from.values());
        if let Some(slot) = self.space.get_mut(target) {
            slot.store(engine.scratch.iter().copied());
            slot.align(engine.bindings.len());
        }
        engine.selection.forget(target);
        debug!(source, target, "Copied slot.");
        Ok(())
    }

    /// Remembers `index` as the source of the next paste.
    pub fn copy(&mut self, index: usize) -> Result<(), TransitError> {
        let total = self.space.total();
        if index >= total {
            return Err(TransitError::InvalidIndex {
                index,
                bound: total,
            });
        }
        self.engine.clipboard = Some(index);
        Ok(())
    }

    /// Pastes the remembered slot into `index`. Does nothing if nothing was copied.
    pub fn paste(&mut self, index: usize) -> Result<(), TransitError> {
        match self.engine.clipboard {
            Some(source) => self.copy_paste(source, index),
            None => Ok(()),
        }
    }

    /// Sets how many slots the policies and buttons address.
    pub fn set_active_count(&mut self, count: usize) -> Result<(), TransitError> {
        let total = self.space.total();
        if count == 0 || count > total {
            return Err(TransitError::InvalidIndex {
                index: count,
                bound: total,
            });
        }
        self.engine.selection.set_active_count(count);
        debug!(count, "Active slot count changed.");
        Ok(())
    }

    /// Switches between read and write mode and tells the chain.
    pub fn set_write_mode(&mut self, write_mode: bool) {
        self.engine.params.write_mode = write_mode;
        self.space.sync_write_mode(self.id, write_mode);
    }

    /// Binds a parameter. Every used slot receives the parameter's current
    /// value as its new column. Returns false if it was already bound.
    pub fn bind(&mut self, param: ParamRef) -> bool {
        let _enter = self.span.enter();
        let bound = self.engine.bindings.bind(param);
        if let Some((column, value)) = bound {
            self.space.for_each_mut(|slot| {
                if slot.is_used() {
                    slot.align(column);
                    slot.push(value);
                }
            });
            self.engine.crossfade.reserve(self.engine.bindings.len());
            info!(
                owner_id = param.owner_id,
                param_index = param.param_index,
                column,
                "Bound parameter."
            );
        }
        bound.is_some()
    }

    /// Binds every parameter of an owner. Returns how many were newly bound.
    pub fn bind_owner(&mut self, owner_id: i64) -> usize {
        let count = self
            .engine
            .bindings
            .registry()
            .param_count(owner_id)
            .unwrap_or(0);
        (0..count)
            .filter(|&param_index| self.bind(ParamRef::new(owner_id, param_index)))
            .count()
    }

    /// Releases the binding of a column. The column stays in every slot.
    pub fn unbind(&mut self, column: usize) -> Result<(), TransitError> {
        let _enter = self.span.enter();
        self.engine.bindings.unbind(column)?;
        info!(column, "Unbound parameter.");
        Ok(())
    }

    /// Drops every binding and slot, including those of the chain, and returns
    /// the parameters to their defaults.
    pub fn reset(&mut self) {
        let _enter = self.span.enter();
        let engine = &mut *self.engine;
        engine.bindings.clear();
        self.space.reset();
        engine.selection.reset(self.space.per_instance());
        engine.crossfade.reset();
        engine.params = Params {
            panel_theme: engine.params.panel_theme,
            ..Params::default()
        };
        let division = engine.config.process_division();
        engine.set_process_division(division);
        engine.outputs = Outputs::default();
        engine.clipboard = None;
        engine.slot_trigger.reset();
        engine.reset_trigger.reset();
        info!(links = self.space.links(), "Reset.");
    }

    /// Applies a queued command.
    pub fn apply(&mut self, command: Command) {
        let result = match command {
            Command::Load(index) => self.load(index, false, false).map(|_| ()),
            Command::Save(index) => self.save(index),
            Command::Clear(index) => self.clear(index),
            Command::Randomize(index) => self.randomize(index),
            Command::Copy(index) => self.copy(index),
            Command::Paste(index) => self.paste(index),
            Command::SetActiveCount(count) => self.set_active_count(count),
            Command::SetWriteMode(write_mode) => {
                self.set_write_mode(write_mode);
                Ok(())
            }
            Command::SetFade(fade) => {
                self.engine.set_fade(fade);
                Ok(())
            }
            Command::SetShape(shape) => {
                self.engine.set_shape(shape);
                Ok(())
            }
            Command::SetPanelTheme(theme) => {
                self.engine.params.panel_theme = theme;
                Ok(())
            }
            Command::SetMappingIndicatorHidden(hidden) => {
                self.engine.params.indicator_hidden = hidden;
                Ok(())
            }
            Command::SetProcessDivision(division) => {
                self.engine.set_process_division(division);
                Ok(())
            }
            Command::SetSlotCvMode(mode) => {
                self.engine.selection.set_mode(mode);
                Ok(())
            }
            Command::SetOutMode(mode) => {
                self.engine.params.out_mode = mode;
                Ok(())
            }
        };
        ignored("command", result);
    }
}

/// Logs a request the evaluation had to drop.
fn ignored(source: &'static str, result: Result<(), TransitError>) {
    if let Err(error) = result {
        trace!(source, %error, "Request ignored.");
    }
}
