//! Turn-by-turn booking conversation.
//!
//! A chat front end collects booking parameters one answer at a time:
//! name → phone → service → provider → date → time → confirm. Each
//! [`BookingSession`] is a small state machine over those stages. It only
//! reads from the scheduler while collecting answers; the client record and
//! the booking are written on a positive confirmation and nowhere else.
//!
//! Prompts are data (the choices to offer), never display text.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::availability::Slot;
use crate::clock;
use crate::error::{BookingError, Result};
use crate::phone::normalize_phone;
use crate::scheduler::Scheduler;
use crate::store::Store;
use crate::types::{BookingId, ClientId, Provider, Service};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Name,
    Phone,
    Service,
    Provider,
    Date,
    Time,
    Confirm,
    Finished,
}

/// What the front end should ask (or report) next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "prompt", rename_all = "snake_case")]
pub enum Prompt {
    AskName,
    AskPhone,
    ChooseService { options: Vec<Service> },
    ChooseProvider { options: Vec<Provider> },
    /// Ask for a date; `no_slots_on` is set when the previous answer had no
    /// free slots.
    ChooseDate { no_slots_on: Option<NaiveDate> },
    ChooseTime { options: Vec<Slot> },
    Confirm { draft: Draft },
    Booked { booking: BookingId, client: ClientId },
    Aborted,
}

/// Answers collected so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Draft {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub service: Option<Service>,
    pub provider: Option<Provider>,
    pub date: Option<NaiveDate>,
    #[serde(serialize_with = "serialize_opt_time")]
    pub start: Option<NaiveTime>,
}

#[derive(Debug, Clone)]
pub struct BookingSession {
    stage: Stage,
    external_id: Option<i64>,
    draft: Draft,
    offered: Vec<Slot>,
}

impl BookingSession {
    /// Start a conversation for a messenger account (if any).
    pub fn new(external_id: Option<i64>) -> (Self, Prompt) {
        let session = Self {
            stage: Stage::Name,
            external_id,
            draft: Draft::default(),
            offered: Vec::new(),
        };
        (session, Prompt::AskName)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Feed the answer to the current question.
    ///
    /// An invalid answer returns an error and leaves the session at the same
    /// stage so the question can be asked again.
    pub fn advance<S: Store>(&mut self, scheduler: &Scheduler<S>, input: &str) -> Result<Prompt> {
        let input = input.trim();
        let prompt = match self.stage {
            Stage::Name => {
                if input.is_empty() {
                    return Err(BookingError::InvalidInput("name is empty".to_string()));
                }
                self.draft.name = Some(input.to_string());
                self.stage = Stage::Phone;
                Prompt::AskPhone
            }
            Stage::Phone => {
                self.draft.phone = Some(normalize_phone(input)?);
                self.stage = Stage::Service;
                Prompt::ChooseService {
                    options: scheduler.list_services()?,
                }
            }
            Stage::Service => {
                let service = scheduler.find_service(input)?;
                let options = scheduler.providers_for_service(service.id)?;
                self.draft.service = Some(service);
                self.stage = Stage::Provider;
                Prompt::ChooseProvider { options }
            }
            Stage::Provider => {
                self.draft.provider = Some(scheduler.find_provider(input)?);
                self.stage = Stage::Date;
                Prompt::ChooseDate { no_slots_on: None }
            }
            Stage::Date => self.choose_date(scheduler, input)?,
            Stage::Time => {
                let start = clock::parse_time(input)?;
                if !self.offered.iter().any(|slot| slot.start == start) {
                    return Err(BookingError::InvalidInput(format!(
                        "{} is not one of the offered times",
                        input
                    )));
                }
                self.draft.start = Some(start);
                self.stage = Stage::Confirm;
                Prompt::Confirm {
                    draft: self.draft.clone(),
                }
            }
            Stage::Confirm => {
                return Err(BookingError::InvalidInput(
                    "awaiting confirmation".to_string(),
                ))
            }
            Stage::Finished => {
                return Err(BookingError::InvalidInput("session is finished".to_string()))
            }
        };
        debug!(stage = ?self.stage, "session advanced");
        Ok(prompt)
    }

    fn choose_date<S: Store>(&mut self, scheduler: &Scheduler<S>, input: &str) -> Result<Prompt> {
        let date = clock::parse_date(input)?;
        let (Some(service), Some(provider)) = (&self.draft.service, &self.draft.provider) else {
            return Err(BookingError::InvalidInput(
                "service and provider not chosen".to_string(),
            ));
        };

        let slots = scheduler.available_slots(provider.id, date, service.duration_minutes)?;
        if slots.is_empty() {
            return Ok(Prompt::ChooseDate {
                no_slots_on: Some(date),
            });
        }

        self.draft.date = Some(date);
        self.offered = slots.clone();
        self.stage = Stage::Time;
        Ok(Prompt::ChooseTime { options: slots })
    }

    /// Answer the confirmation question.
    ///
    /// On `accepted` the client is resolved (or created) and the booking is
    /// committed; the ledger re-checks the slot, so a slot taken since it was
    /// offered fails here with `SlotConflict`. Either way the session ends.
    pub fn confirm<S: Store>(
        &mut self,
        scheduler: &Scheduler<S>,
        accepted: bool,
    ) -> Result<Prompt> {
        if self.stage != Stage::Confirm {
            return Err(BookingError::InvalidInput(format!(
                "cannot confirm at stage {:?}",
                self.stage
            )));
        }
        self.stage = Stage::Finished;
        if !accepted {
            return Ok(Prompt::Aborted);
        }

        let draft = &self.draft;
        let (Some(name), Some(phone), Some(service), Some(provider), Some(date), Some(start)) = (
            draft.name.as_deref(),
            draft.phone.as_deref(),
            draft.service.as_ref(),
            draft.provider.as_ref(),
            draft.date,
            draft.start,
        ) else {
            return Err(BookingError::InvalidInput("incomplete booking".to_string()));
        };

        let client = scheduler.resolve_or_create(name, phone, self.external_id)?;
        let booking = scheduler.create_booking(client, service.id, provider.id, date, start)?;
        Ok(Prompt::Booked { booking, client })
    }
}

/// Live sessions keyed by conversation id.
///
/// Each conversation sits behind its own lock. A turn holds that lock while
/// the scheduler runs, so a second message for the same conversation waits
/// for the first instead of failing. The map lock is only held to look a
/// session up or swap it out.
///
/// `start` replaces the session; a turn still running on the old one keeps
/// writing to it, but that session is no longer reachable and its answer is
/// an error. Abandoned conversations stay until [`Sessions::prune`] drops
/// them.
#[derive(Debug, Default)]
pub struct Sessions {
    inner: Mutex<HashMap<String, Arc<Mutex<Entry>>>>,
}

#[derive(Debug)]
struct Entry {
    session: BookingSession,
    last_used: Instant,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the conversation `id`.
    pub fn start(&self, id: &str, external_id: Option<i64>) -> Prompt {
        let (session, prompt) = BookingSession::new(external_id);
        let entry = Entry {
            session,
            last_used: Instant::now(),
        };
        self.inner
            .lock()
            .insert(id.to_string(), Arc::new(Mutex::new(entry)));
        prompt
    }

    pub fn advance<S: Store>(
        &self,
        id: &str,
        scheduler: &Scheduler<S>,
        input: &str,
    ) -> Result<Prompt> {
        let shared = self.get(id)?;
        let mut entry = shared.lock();
        self.ensure_current(id, &shared)?;
        entry.last_used = Instant::now();
        let result = entry.session.advance(scheduler, input);
        drop(entry);

        if !self.is_current(id, &shared) {
            debug!(session = id, "session restarted during turn");
            return Err(restarted(id));
        }
        result
    }

    /// Confirm or decline; the session is removed afterwards.
    pub fn confirm<S: Store>(
        &self,
        id: &str,
        scheduler: &Scheduler<S>,
        accepted: bool,
    ) -> Result<Prompt> {
        let shared = self.get(id)?;
        let mut entry = shared.lock();
        self.ensure_current(id, &shared)?;
        entry.last_used = Instant::now();
        let result = entry.session.confirm(scheduler, accepted);
        let finished = entry.session.stage() == Stage::Finished;
        drop(entry);

        if finished {
            let mut map = self.inner.lock();
            if map.get(id).is_some_and(|current| Arc::ptr_eq(current, &shared)) {
                map.remove(id);
            }
        }
        result
    }

    pub fn abort(&self, id: &str) -> bool {
        self.inner.lock().remove(id).is_some()
    }

    /// Current stage of `id`. Waits for a running turn on that session.
    pub fn stage(&self, id: &str) -> Option<Stage> {
        let shared = self.inner.lock().get(id).cloned()?;
        let stage = shared.lock().session.stage();
        Some(stage)
    }

    /// Drop sessions idle for at least `idle`; returns how many went.
    ///
    /// Sessions with a turn in progress are kept.
    pub fn prune(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let mut map = self.inner.lock();
        let before = map.len();
        map.retain(|_, shared| match shared.try_lock() {
            Some(entry) => now.saturating_duration_since(entry.last_used) < idle,
            None => true,
        });
        let pruned = before - map.len();
        if pruned > 0 {
            debug!(pruned, "idle sessions dropped");
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn get(&self, id: &str) -> Result<Arc<Mutex<Entry>>> {
        self.inner
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| BookingError::InvalidInput(format!("no active session '{}'", id)))
    }

    fn is_current(&self, id: &str, shared: &Arc<Mutex<Entry>>) -> bool {
        self.inner
            .lock()
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, shared))
    }

    /// A turn that waited behind another may find its session replaced.
    fn ensure_current(&self, id: &str, shared: &Arc<Mutex<Entry>>) -> Result<()> {
        if self.is_current(id, shared) {
            Ok(())
        } else {
            Err(restarted(id))
        }
    }
}

fn restarted(id: &str) -> BookingError {
    BookingError::InvalidInput(format!("session '{}' was restarted", id))
}

fn serialize_opt_time<S: serde::Serializer>(
    time: &Option<NaiveTime>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match time {
        Some(time) => serializer.serialize_some(&clock::format_time(*time)),
        None => serializer.serialize_none(),
    }
}
