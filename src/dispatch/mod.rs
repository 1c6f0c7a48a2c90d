//! Routes resolved requests to providers and writes the results back into
//! the note, one action at a time or a whole note template at once.

use std::collections::BTreeMap;

use crate::{
    config::{
        ButtonConfig,
        Endpoint,
        FieldCompletion,
        GlobalConfig,
        ProfileConfig,
    },
    core::{
        utils::split_tags,
        SuggestError,
    },
    host::{
        NoteHost,
        WriteTarget,
    },
    providers::Providers,
    resolve::{
        resolve,
        Layer,
        ParameterBag,
        Precedence,
    },
    suggestion::Suggestion,
    template::Scope,
};


pub const NO_TARGET_NOTICE: &str = "Please focus on a field first!";

/// Lets the user review a rendered query before it is sent.
pub trait QueryEditor {
    /// `None` cancels the action.
    fn edit(&mut self, query: &str) -> Option<String>;
}

pub enum Trigger<'e> {
    /// Send the rendered query as is.
    Fast,
    Confirm(&'e mut dyn QueryEditor),
}

#[derive(Debug)]
pub enum Outcome {
    Done(WriteTarget),
    Skipped(String),
    Failed(SuggestError),
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Per-field results of one bulk run, in template field order.
#[derive(Debug, Default)]
pub struct BulkReport {
    /// Set when the run did not start at all.
    pub skipped: Option<String>,
    pub fields: Vec<(String, Outcome)>,
    /// Set when the fields were written but the host could not save them.
    pub refresh_error: Option<SuggestError>,
}

impl BulkReport {
    fn skipped(notice: String) -> Self {
        Self { skipped: Some(notice), ..Self::default() }
    }

    pub fn outcome(&self, field: &str) -> Option<&Outcome> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, outcome)| outcome)
    }

    pub fn done_count(&self) -> usize {
        self.fields.iter().filter(|(_, o)| o.is_done()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.fields.iter().filter(|(_, o)| o.is_failed()).count()
    }
}

/// A text field waiting on the batched request.
struct Queued {
    name: String,
    target: WriteTarget,
}

/// Snapshot of the note's fields taken when a flow starts.
struct Snapshot {
    names: Vec<String>,
    values: Vec<String>,
}

impl Snapshot {
    fn of(host: &dyn NoteHost) -> Self {
        Self { names: host.field_names(), values: host.field_values() }
    }

    fn scope(&self, bag: &ParameterBag) -> Scope {
        Scope::new(&self.names, &self.values, bag)
    }
}

pub struct Dispatcher<'a, P: Providers + ?Sized> {
    config: &'a GlobalConfig,
    profile: &'a ProfileConfig,
    providers: &'a P,
}

impl<'a, P: Providers + ?Sized> Dispatcher<'a, P> {
    pub fn new(config: &'a GlobalConfig, profile: &'a ProfileConfig, providers: &'a P) -> Self {
        Self { config, profile, providers }
    }

    /// Runs one button against the field the host has focused.
    pub fn run_action(
        &self,
        host: &mut dyn NoteHost,
        button: &ButtonConfig,
        trigger: Trigger<'_>,
    ) -> Outcome {
        let Some(target) = host.current_target() else {
            return skip(host, NO_TARGET_NOTICE.to_string());
        };

        let snapshot = Snapshot::of(host);
        let outcome = self.execute(host, &snapshot, target, &button.endpoint, &button.prompt, button, trigger);
        if outcome.is_done() {
            if let Err(e) = host.refresh() {
                return fail(host, e);
            }
        }
        outcome
    }

    /// Fills every enabled field of the note type's template. Text fields share
    /// one batched request; the rest run one by one.
    pub fn fill_note(&self, host: &mut dyn NoteHost) -> BulkReport {
        let note_type = host.note_type_id();
        let Some(template) = self.config.note_template(&note_type) else {
            let notice = format!("No note template configured for note type {note_type}");
            host.notify(&notice);
            tracing::warn!("{}", notice);
            return BulkReport::skipped(notice);
        };

        let saved_focus = host.current_target();
        let snapshot = Snapshot::of(host);
        let mut outcomes: BTreeMap<String, Outcome> = BTreeMap::new();
        let mut batch: Vec<Queued> = Vec::new();
        let mut queries: BTreeMap<String, String> = BTreeMap::new();
        let mut singles: Vec<(&String, &FieldCompletion, WriteTarget)> = Vec::new();

        for (name, completion) in template.enabled_fields() {
            let Some(target) = WriteTarget::resolve(name, &snapshot.names) else {
                outcomes.insert(name.clone(), fail(host, SuggestError::FieldNotFound(name.clone())));
                continue;
            };
            let endpoint = match completion.endpoint.parse::<Endpoint>() {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    outcomes.insert(name.clone(), fail(host, e));
                    continue;
                }
            };
            if !endpoint.is_batchable() {
                singles.push((name, completion, target));
                continue;
            }

            let bag = resolve(self.config, self.profile, Some(completion as &dyn Layer));
            match snapshot.scope(&bag).render(&completion.prompt) {
                Ok(query) if query.trim().is_empty() => {
                    outcomes.insert(name.clone(), Outcome::Skipped(format!("Empty query for {name}")));
                }
                Ok(query) => {
                    queries.insert(name.clone(), query);
                    batch.push(Queued { name: name.clone(), target });
                }
                Err(e) => {
                    outcomes.insert(name.clone(), fail(host, e));
                }
            }
        }

        if !batch.is_empty() {
            for (name, outcome) in self.run_batch(host, &snapshot, &template.shared_prompt, &queries, batch) {
                outcomes.insert(name, outcome);
            }
        }

        for (name, completion, target) in singles {
            host.set_current_target(Some(target));
            let outcome = self.execute(
                host,
                &snapshot,
                target,
                &completion.endpoint,
                &completion.prompt,
                completion,
                Trigger::Fast,
            );
            outcomes.insert(name.clone(), outcome);
        }

        host.set_current_target(saved_focus);
        let refresh_error = match host.refresh() {
            Ok(()) => None,
            Err(e) => {
                host.notify(&e.to_string());
                tracing::warn!("Saving the filled note failed: {}", e);
                Some(e)
            }
        };

        let fields: Vec<(String, Outcome)> = template
            .enabled_fields()
            .filter_map(|(name, _)| outcomes.remove_entry(name))
            .collect();
        let done = fields.iter().filter(|(_, o)| o.is_done()).count();
        tracing::info!("Filled {}/{} fields of note type {}", done, fields.len(), note_type);
        BulkReport { skipped: None, fields, refresh_error }
    }

    fn run_batch(
        &self,
        host: &mut dyn NoteHost,
        snapshot: &Snapshot,
        shared_prompt: &str,
        queries: &BTreeMap<String, String>,
        batch: Vec<Queued>,
    ) -> Vec<(String, Outcome)> {
        let bag = resolve(self.config, self.profile, None);
        let result = self
            .system_context(snapshot, &bag, shared_prompt)
            .and_then(|context| self.providers.batch_text_completion(queries, &context, &bag));

        let mut suggestions = match result {
            Ok(suggestions) => suggestions,
            Err(e) => {
                host.notify(&e.to_string());
                tracing::warn!("Batched completion failed: {}", e);
                return batch.into_iter().map(|q| (q.name, Outcome::Failed(shared_failure(&e)))).collect();
            }
        };

        batch
            .into_iter()
            .map(|queued| {
                let outcome = match suggestions.remove(&queued.name) {
                    Some(suggestion) => match write_back(host, queued.target, &suggestion) {
                        Ok(()) => Outcome::Done(queued.target),
                        Err(e) => fail(host, e),
                    },
                    None => fail(host, SuggestError::PartialBatch(queued.name.clone())),
                };
                (queued.name, outcome)
            })
            .collect()
    }

    /// The profile's system prompt followed by the template's shared prompt.
    fn system_context(
        &self,
        snapshot: &Snapshot,
        bag: &ParameterBag,
        shared_prompt: &str,
    ) -> Result<String, SuggestError> {
        let scope = snapshot.scope(bag);
        let parts = [scope.render(&self.profile.system_prompt)?, scope.render(shared_prompt)?];
        Ok(parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect::<Vec<_>>().join("\n"))
    }

    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        host: &mut dyn NoteHost,
        snapshot: &Snapshot,
        target: WriteTarget,
        endpoint: &str,
        prompt: &str,
        action: &dyn Layer,
        trigger: Trigger<'_>,
    ) -> Outcome {
        let mut bag = resolve(self.config, self.profile, Some(action));
        let scope = snapshot.scope(&bag);

        let mut query = match scope.render(prompt) {
            Ok(query) => query,
            Err(e) => return fail(host, e),
        };
        if let Trigger::Confirm(editor) = trigger {
            match editor.edit(&query) {
                Some(edited) => query = edited,
                None => return Outcome::Skipped("Cancelled".to_string()),
            }
        }
        if query.trim().is_empty() {
            return skip(host, "Empty query".to_string());
        }

        let endpoint = match endpoint.parse::<Endpoint>() {
            Ok(endpoint) => endpoint,
            Err(e) => return fail(host, e),
        };

        let result = match endpoint {
            Endpoint::ImageSearch => self.providers.image_search(&query, &bag),
            Endpoint::Pronunciation => self.providers.pronunciation_lookup(&query, &bag),
            Endpoint::TextGeneration => match scope.render(&self.profile.system_prompt) {
                Ok(system) => {
                    bag.insert("system_prompt", system, Precedence::Action);
                    self.providers.text_completion(&query, &bag)
                }
                Err(e) => Err(e),
            },
        };

        let suggestion = match result {
            Ok(suggestion) => suggestion,
            Err(e) => return fail(host, e),
        };
        match write_back(host, target, &suggestion) {
            Ok(()) => {
                tracing::info!("Wrote {} suggestion for {:?} to {}", suggestion.kind(), query, target);
                Outcome::Done(target)
            }
            Err(e) => fail(host, e),
        }
    }
}

/// Renders the suggestion with remote URLs made local, then writes it.
pub fn write_back(
    host: &mut dyn NoteHost,
    target: WriteTarget,
    suggestion: &Suggestion,
) -> Result<(), SuggestError> {
    if let WriteTarget::Field(index) = target {
        if index >= host.field_count() {
            return Err(SuggestError::FieldNotFound(format!("#{index}")));
        }
    }
    let markup = suggestion.to_markup(|url| host.resolve_remote_url(url))?;
    if markup.trim().is_empty() {
        return Err(SuggestError::NoContent);
    }
    match target {
        WriteTarget::Field(index) => host.set_field(index, &markup),
        WriteTarget::Tags => host.append_tags(&split_tags(&markup)),
    }
}

fn skip(host: &mut dyn NoteHost, notice: String) -> Outcome {
    host.notify(&notice);
    tracing::warn!("Skipped: {}", notice);
    Outcome::Skipped(notice)
}

fn fail(host: &mut dyn NoteHost, error: SuggestError) -> Outcome {
    if error.is_skip() {
        return skip(host, error.to_string());
    }
    host.notify(&error.to_string());
    tracing::warn!("Failed: {}", error);
    Outcome::Failed(error)
}

/// Copies an error that ended a whole batch so each queued field can carry it.
fn shared_failure(error: &SuggestError) -> SuggestError {
    match error {
        SuggestError::Provider { provider, message } => {
            SuggestError::Provider { provider: *provider, message: message.clone() }
        }
        SuggestError::TemplateKey(key) => SuggestError::TemplateKey(key.clone()),
        SuggestError::TemplateSyntax { position, message } => {
            SuggestError::TemplateSyntax { position: *position, message: message.clone() }
        }
        other => SuggestError::Custom(other.to_string()),
    }
}
