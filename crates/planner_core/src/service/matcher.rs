//! Bounded paginated entity matcher.
//!
//! # Responsibility
//! - Find the existing todo, note or action a descriptor refers to by
//!   showing the gateway small pages of recent candidates.
//!
//! # Invariants
//! - At most `lookback / page_size` pages are requested (minimum one).
//! - An empty page, or running out of pages, ends with "no match".
//! - A returned entity is always one of the candidates on the page the
//!   gateway was shown.

use crate::config::MatcherSettings;
use crate::error::ProcessResult;
use crate::llm::{RetryPolicy, ToolGateway};
use crate::model::action::Action;
use crate::model::command::CommandTarget;
use crate::model::note::Note;
use crate::model::todo::Todo;
use crate::model::{RecordId, NO_MATCH_ID};
use crate::repo::{ListQuery, Store, TodoListQuery, TodoStatusFilter};
use crate::tools::{select_match_tool, SelectMatchArgs};
use log::{debug, info, warn};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Kind of entity to search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTarget {
    /// Open todos whose source note falls in the recency window.
    Todo,
    /// Notes written before the reference time.
    Note,
    /// Actions, newest first.
    Action,
}

impl MatchTarget {
    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Note => "note",
            Self::Action => "action",
        }
    }
}

impl From<CommandTarget> for MatchTarget {
    fn from(value: CommandTarget) -> Self {
        match value {
            CommandTarget::Note => Self::Note,
            CommandTarget::Todo => Self::Todo,
            CommandTarget::Action => Self::Action,
        }
    }
}

/// What to look for and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub target: MatchTarget,
    /// Serialized action, command or subtask the candidates are compared to.
    pub descriptor: String,
    /// Epoch ms the search looks back from.
    pub reference_time: i64,
    pub exclude_id: Option<RecordId>,
    /// Offer the `mark_complete` flag (todo matches for actions).
    pub with_mark_complete: bool,
}

impl MatchRequest {
    pub fn new(target: MatchTarget, descriptor: impl Into<String>, reference_time: i64) -> Self {
        Self {
            target,
            descriptor: descriptor.into(),
            reference_time,
            exclude_id: None,
            with_mark_complete: false,
        }
    }

    pub fn excluding(mut self, id: RecordId) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn with_mark_complete(mut self) -> Self {
        self.with_mark_complete = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedEntity {
    Todo(Todo),
    Note(Note),
    Action(Action),
}

impl MatchedEntity {
    pub fn id(&self) -> RecordId {
        match self {
            Self::Todo(todo) => todo.id,
            Self::Note(note) => note.id,
            Self::Action(action) => action.id,
        }
    }

    fn prompt_line(&self) -> String {
        match self {
            Self::Todo(todo) => todo.prompt_line(),
            Self::Note(note) => note.prompt_line(),
            Self::Action(action) => action.prompt_line(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub entity: MatchedEntity,
    pub mark_complete: bool,
}

pub struct EntityMatcher<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> {
    store: &'a S,
    gateway: &'a G,
    settings: MatcherSettings,
}

impl<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> EntityMatcher<'a, S, G> {
    pub fn new(store: &'a S, gateway: &'a G, settings: MatcherSettings) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    /// Page budget derived from the lookback cap.
    pub fn page_policy(&self) -> RetryPolicy {
        let page_size = self.settings.page_size.max(1);
        RetryPolicy::immediate(self.settings.lookback.div_ceil(page_size))
    }

    /// Returns `Ok(None)` when nothing in the lookback window matches.
    ///
    /// # Errors
    /// - Storage failures and exhausted gateway retries. A malformed matcher
    ///   answer only skips its page.
    pub fn find(&self, request: &MatchRequest) -> ProcessResult<Option<MatchResult>> {
        let page_size = self.settings.page_size.max(1);
        let policy = self.page_policy();

        for page in policy.attempts() {
            let offset = (page - 1) * page_size;
            let candidates = self.fetch_page(request, page_size, offset)?;
            if candidates.is_empty() {
                debug!(
                    "event=match_end module=matcher status=ok target={} reason=exhausted pages={}",
                    request.target.label(),
                    page - 1
                );
                return Ok(None);
            }

            if let Some(result) = self.ask(request, candidates)? {
                info!(
                    "event=match_found module=matcher status=ok target={} id={} page={} mark_complete={}",
                    request.target.label(),
                    result.entity.id(),
                    page,
                    result.mark_complete
                );
                return Ok(Some(result));
            }
        }

        info!(
            "event=match_end module=matcher status=ok target={} reason=lookback_cap lookback={}",
            request.target.label(),
            self.settings.lookback
        );
        Ok(None)
    }

    fn fetch_page(
        &self,
        request: &MatchRequest,
        limit: u32,
        offset: u32,
    ) -> ProcessResult<Vec<MatchedEntity>> {
        let page = ListQuery {
            limit: Some(limit),
            offset,
            ..ListQuery::default()
        };
        let candidates: Vec<MatchedEntity> = match request.target {
            MatchTarget::Todo => {
                let window_start =
                    request.reference_time - self.settings.window_days.max(0) * MS_PER_DAY;
                self.store
                    .list_todos(&TodoListQuery {
                        list: ListQuery {
                            after: Some(window_start),
                            ..page
                        },
                        status: TodoStatusFilter::Open,
                        exclude_id: request.exclude_id,
                    })?
                    .into_iter()
                    .map(MatchedEntity::Todo)
                    .collect()
            }
            MatchTarget::Note => self
                .store
                .list_notes(&ListQuery {
                    before: Some(request.reference_time),
                    ..page
                })?
                .into_iter()
                .map(MatchedEntity::Note)
                .collect(),
            MatchTarget::Action => self
                .store
                .list_actions(&page)?
                .into_iter()
                .map(MatchedEntity::Action)
                .collect(),
        };
        // Non-todo lists have no SQL-side exclusion; a shorter page is fine.
        Ok(candidates
            .into_iter()
            .filter(|candidate| Some(candidate.id()) != request.exclude_id)
            .collect())
    }

    fn ask(
        &self,
        request: &MatchRequest,
        candidates: Vec<MatchedEntity>,
    ) -> ProcessResult<Option<MatchResult>> {
        let label = request.target.label();
        let ids: Vec<RecordId> = candidates.iter().map(MatchedEntity::id).collect();
        let listing = candidates
            .iter()
            .map(MatchedEntity::prompt_line)
            .collect::<Vec<_>>()
            .join("\n");
        let instructions = format!(
            "You match user input to an existing {label}. Call `select_match` once with the id \
             of the {label} the input clearly refers to, or 0 if none of these is it.\n\n\
             Candidates:\n{listing}"
        );
        let tool = select_match_tool(label, &ids, request.with_mark_complete);

        let invocations = self
            .gateway
            .call(&instructions, &request.descriptor, std::slice::from_ref(&tool))?;
        let Some(invocation) = invocations.first() else {
            debug!("event=match_page module=matcher status=skip target={label} reason=no_tool_call");
            return Ok(None);
        };
        let args = match SelectMatchArgs::parse(invocation) {
            Ok(args) => args,
            Err(err) => {
                warn!("event=match_page module=matcher status=skip target={label} reason=invalid_args error={err}");
                return Ok(None);
            }
        };
        if args.id == NO_MATCH_ID {
            return Ok(None);
        }

        let Some(entity) = candidates.into_iter().find(|candidate| candidate.id() == args.id) else {
            warn!(
                "event=match_page module=matcher status=skip target={label} reason=id_not_on_page id={}",
                args.id
            );
            return Ok(None);
        };
        Ok(Some(MatchResult {
            entity,
            mark_complete: request.with_mark_complete && args.mark_complete.unwrap_or(false),
        }))
    }
}
