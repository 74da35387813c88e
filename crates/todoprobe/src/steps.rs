//! Step vocabulary: the fixed phrases scenarios may use, bound to typed
//! handlers on [`TodoPage`].
//!
//! Phrases use two placeholders, `{string}` (a double-quoted string, captured
//! without its quotes) and `{int}` (a decimal count). Each phrase is compiled
//! to an anchored regex when the vocabulary is built; duplicate phrases,
//! unknown placeholders and handlers whose arity disagrees with the phrase are
//! rejected up front.

use crate::locator::Locator;
use crate::page::PageObject;
use crate::result::{ProbeError, ProbeResult};
use crate::todo_page::{Filter, TodoPage};
use futures::future::{FutureExt, LocalBoxFuture};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Future returned by every step handler
pub type StepFuture<'a> = LocalBoxFuture<'a, ProbeResult<()>>;

/// Column read from data tables
pub const TASK_COLUMN: &str = "task";

/// A step handler, by the arguments it takes
#[derive(Clone, Copy)]
pub enum Handler {
    /// No arguments
    Plain(for<'a> fn(&'a TodoPage) -> StepFuture<'a>),
    /// One `{string}`
    Text(for<'a> fn(&'a TodoPage, String) -> StepFuture<'a>),
    /// Two `{string}`s
    TwoText(for<'a> fn(&'a TodoPage, String, String) -> StepFuture<'a>),
    /// One `{int}`
    Count(for<'a> fn(&'a TodoPage, usize) -> StepFuture<'a>),
    /// The `task` column of the step's data table
    Table(for<'a> fn(&'a TodoPage, Vec<String>) -> StepFuture<'a>),
}

impl Handler {
    fn expects(self) -> &'static [Placeholder] {
        match self {
            Self::Plain(_) | Self::Table(_) => &[],
            Self::Text(_) => &[Placeholder::String],
            Self::TwoText(_) => &[Placeholder::String, Placeholder::String],
            Self::Count(_) => &[Placeholder::Int],
        }
    }

    const fn kind(self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Text(_) => "text",
            Self::TwoText(_) => "two-text",
            Self::Count(_) => "count",
            Self::Table(_) => "table",
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{}", self.kind())
    }
}

/// Placeholder kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{string}`
    String,
    /// `{int}`
    Int,
}

/// A phrase and its handler, before compilation
#[derive(Debug, Clone, Copy)]
pub struct StepDef {
    /// Phrase with placeholders
    pub phrase: &'static str,
    /// Handler
    pub handler: Handler,
}

impl StepDef {
    /// Pair a phrase with a handler
    #[must_use]
    pub const fn new(phrase: &'static str, handler: Handler) -> Self {
        Self { phrase, handler }
    }
}

#[derive(Debug)]
struct CompiledStep {
    phrase: &'static str,
    regex: Regex,
    handler: Handler,
}

/// A step text matched against the vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMatch {
    /// Phrase that matched
    pub phrase: &'static str,
    /// Captured placeholder values, in order
    pub args: Vec<String>,
}

/// Compile a phrase into an anchored regex.
///
/// # Errors
///
/// Returns [`ProbeError::StepVocabulary`] for unknown or unterminated
/// placeholders.
pub fn compile_expression(phrase: &str) -> ProbeResult<(Regex, Vec<Placeholder>)> {
    let mut pattern = String::from("^");
    let mut placeholders = Vec::new();
    let mut rest = phrase;

    while let Some(open) = rest.find('{') {
        pattern.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| ProbeError::StepVocabulary {
            message: format!("unterminated placeholder in \"{phrase}\""),
        })?;
        match &after[..close] {
            "string" => {
                pattern.push_str("\"([^\"]*)\"");
                placeholders.push(Placeholder::String);
            }
            "int" => {
                pattern.push_str(r"(\d+)");
                placeholders.push(Placeholder::Int);
            }
            other => {
                return Err(ProbeError::StepVocabulary {
                    message: format!("unknown placeholder {{{other}}} in \"{phrase}\""),
                })
            }
        }
        rest = &after[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| ProbeError::StepVocabulary {
        message: format!("\"{phrase}\" does not compile: {e}"),
    })?;
    Ok((regex, placeholders))
}

/// Read the `task` column of a data table whose first row is the header
///
/// # Errors
///
/// Returns [`ProbeError::StepVocabulary`] when the table has no `task` column.
pub fn task_column(rows: &[Vec<String>]) -> ProbeResult<Vec<String>> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let column = header
        .iter()
        .position(|h| h.trim() == TASK_COLUMN)
        .ok_or_else(|| ProbeError::StepVocabulary {
            message: format!("data table has no \"{TASK_COLUMN}\" column (found: {})", header.join(", ")),
        })?;
    Ok(body
        .iter()
        .filter_map(|row| row.get(column))
        .map(|cell| cell.trim().to_string())
        .collect())
}

/// The validated, immutable phrase table
#[derive(Debug)]
pub struct StepVocabulary {
    steps: Vec<CompiledStep>,
}

impl StepVocabulary {
    /// The TodoMVC vocabulary
    ///
    /// # Errors
    ///
    /// Only if the built-in table is inconsistent.
    pub fn todo_mvc() -> ProbeResult<Self> {
        Self::from_defs(todo_mvc_defs())
    }

    /// Compile and validate a phrase table
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::StepVocabulary`] for duplicate phrases, bad
    /// placeholders or an arity mismatch.
    pub fn from_defs(defs: impl IntoIterator<Item = StepDef>) -> ProbeResult<Self> {
        let mut seen = HashSet::new();
        let mut steps = Vec::new();
        for def in defs {
            if !seen.insert(def.phrase) {
                return Err(ProbeError::StepVocabulary {
                    message: format!("duplicate step phrase \"{}\"", def.phrase),
                });
            }
            let (regex, placeholders) = compile_expression(def.phrase)?;
            if placeholders != def.handler.expects() {
                return Err(ProbeError::StepVocabulary {
                    message: format!(
                        "\"{}\" has placeholders {placeholders:?} but its {} handler expects {:?}",
                        def.phrase,
                        def.handler.kind(),
                        def.handler.expects()
                    ),
                });
            }
            steps.push(CompiledStep {
                phrase: def.phrase,
                regex,
                handler: def.handler,
            });
        }
        tracing::debug!(steps = steps.len(), "step vocabulary compiled");
        Ok(Self { steps })
    }

    /// Number of phrases
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Phrases, in table order
    pub fn phrases(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|s| s.phrase)
    }

    /// Compiled patterns, in table order
    pub fn patterns(&self) -> impl Iterator<Item = &Regex> + '_ {
        self.steps.iter().map(|s| &s.regex)
    }

    fn find(&self, text: &str) -> Option<(&CompiledStep, Vec<String>)> {
        let text = text.trim();
        self.steps.iter().find_map(|step| {
            step.regex.captures(text).map(|caps| {
                let args = caps
                    .iter()
                    .skip(1)
                    .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect();
                (step, args)
            })
        })
    }

    /// Match step text (without its keyword)
    #[must_use]
    pub fn match_step(&self, text: &str) -> Option<StepMatch> {
        self.find(text).map(|(step, args)| StepMatch {
            phrase: step.phrase,
            args,
        })
    }

    /// Run the handler bound to `text`.
    ///
    /// # Errors
    ///
    /// [`ProbeError::StepVocabulary`] for undefined steps or a missing data
    /// table, otherwise whatever the handler returns.
    pub async fn execute(&self, page: &TodoPage, text: &str, table: Option<&[Vec<String>]>) -> ProbeResult<()> {
        let (step, mut args) = self.find(text).ok_or_else(|| ProbeError::StepVocabulary {
            message: format!("undefined step: \"{}\"", text.trim()),
        })?;
        tracing::debug!(phrase = step.phrase, ?args, "executing step");

        match step.handler {
            Handler::Plain(f) => f(page).await,
            Handler::Text(f) => f(page, take(&mut args)).await,
            Handler::TwoText(f) => {
                let first = take(&mut args);
                f(page, first, take(&mut args)).await
            }
            Handler::Count(f) => {
                let raw = take(&mut args);
                let n = raw.parse::<usize>().map_err(|_| ProbeError::StepVocabulary {
                    message: format!("\"{raw}\" is not a valid count"),
                })?;
                f(page, n).await
            }
            Handler::Table(f) => {
                let rows = table.ok_or_else(|| ProbeError::StepVocabulary {
                    message: format!("\"{}\" requires a data table", step.phrase),
                })?;
                f(page, task_column(rows)?).await
            }
        }
    }
}

fn take(args: &mut Vec<String>) -> String {
    if args.is_empty() {
        String::new()
    } else {
        args.remove(0)
    }
}

/// The built-in phrase table
#[must_use]
pub fn todo_mvc_defs() -> Vec<StepDef> {
    use Handler::{Count, Plain, Table, Text, TwoText};
    vec![
        // generic
        StepDef::new("I navigate to {string}", Text(navigate_to)),
        StepDef::new("I click on the element {string}", Text(click_element)),
        StepDef::new("I fill {string} with {string}", TwoText(fill_element)),
        StepDef::new("the element {string} should be visible", Text(element_visible)),
        StepDef::new(
            "the element {string} should contain text {string}",
            TwoText(element_contains),
        ),
        StepDef::new("the URL should contain {string}", Text(url_contains)),
        StepDef::new("I wait for {int} seconds", Count(wait_seconds)),
        // todo mvc
        StepDef::new("the user navigates to the TodoMVC application", Plain(open_app)),
        StepDef::new("the user adds the task {string}", Text(add_task)),
        StepDef::new("the user adds the following tasks:", Table(add_tasks)),
        StepDef::new("the user adds {int} tasks", Count(add_numbered_tasks)),
        StepDef::new("the user marks as completed the task {string}", Text(complete_task)),
        StepDef::new("the user unmarks the task {string}", Text(unmark_task)),
        StepDef::new("the user deletes the task {string}", Text(delete_task)),
        StepDef::new("the user deletes all tasks", Plain(delete_all)),
        StepDef::new("the user clears completed tasks", Plain(clear_completed)),
        StepDef::new("the user reloads the page", Plain(reload)),
        StepDef::new("the user filters by all tasks", Plain(filter_all)),
        StepDef::new("the user filters by active tasks", Plain(filter_active)),
        StepDef::new("the user filters by completed tasks", Plain(filter_completed)),
        StepDef::new("the user marks all tasks as completed", Plain(toggle_all)),
        StepDef::new("the counter should show {string}", Text(counter_shows)),
        StepDef::new("the task list should be empty", Plain(list_empty)),
        StepDef::new("the task {string} should be marked as completed", Text(task_completed)),
        StepDef::new(
            "the task {string} should not be marked as completed",
            Text(task_not_completed),
        ),
        StepDef::new("should see {int} task in the list", Count(list_count)),
        StepDef::new("should see {int} tasks in the list", Count(list_count)),
        StepDef::new("should see the task {string}", Text(task_visible)),
        StepDef::new("should not see the task {string}", Text(task_not_visible)),
        StepDef::new("should not see the counter", Plain(counter_hidden)),
        StepDef::new("should see only {int} task", Count(visible_count)),
        StepDef::new("should see only {int} tasks", Count(visible_count)),
        StepDef::new("should see the following tasks:", Table(tasks_visible)),
    ]
}

fn check(ok: bool, message: impl FnOnce() -> String) -> ProbeResult<()> {
    if ok {
        Ok(())
    } else {
        Err(ProbeError::assertion(message()))
    }
}

fn navigate_to(page: &TodoPage, url: String) -> StepFuture<'_> {
    async move { page.interactions().navigate(&url).await }.boxed_local()
}

fn click_element(page: &TodoPage, selector: String) -> StepFuture<'_> {
    async move { page.interactions().click(&Locator::new(selector)).await }.boxed_local()
}

fn fill_element(page: &TodoPage, selector: String, value: String) -> StepFuture<'_> {
    async move {
        page.interactions()
            .fill(&Locator::new(selector), &value)
            .await
    }
    .boxed_local()
}

fn element_visible(page: &TodoPage, selector: String) -> StepFuture<'_> {
    async move {
        let locator = Locator::new(selector.as_str());
        let ui = page.interactions();
        let visible = ui.poll_until(|| ui.is_visible(&locator), |v| *v).await?;
        check(visible, || format!("Element \"{selector}\" should be visible on the page"))
    }
    .boxed_local()
}

fn element_contains(page: &TodoPage, selector: String, expected: String) -> StepFuture<'_> {
    async move {
        let locator = Locator::new(selector.as_str());
        let ui = page.interactions();
        let text = ui
            .poll_until(
                || async {
                    let found = ui.query_all(&locator).await?;
                    Ok::<_, ProbeError>(found.into_iter().next().map(|e| e.text).unwrap_or_default())
                },
                |t| t.contains(expected.as_str()),
            )
            .await?;
        check(text.contains(expected.as_str()), || {
            format!("Element \"{selector}\" should contain the text \"{expected}\"")
        })
    }
    .boxed_local()
}

fn url_contains(page: &TodoPage, part: String) -> StepFuture<'_> {
    async move {
        let ui = page.interactions();
        let url = ui.poll_until(|| ui.url(), |u| u.contains(part.as_str())).await?;
        check(url.contains(part.as_str()), || {
            format!("Current URL \"{url}\" should contain \"{part}\"")
        })
    }
    .boxed_local()
}

fn wait_seconds(page: &TodoPage, seconds: usize) -> StepFuture<'_> {
    async move {
        let seconds = u64::try_from(seconds).unwrap_or(u64::MAX);
        page.interactions().wait(Duration::from_secs(seconds)).await;
        Ok(())
    }
    .boxed_local()
}

fn open_app(page: &TodoPage) -> StepFuture<'_> {
    page.navigate().boxed_local()
}

fn add_task(page: &TodoPage, task: String) -> StepFuture<'_> {
    async move { page.add_todo(&task).await }.boxed_local()
}

fn add_tasks(page: &TodoPage, tasks: Vec<String>) -> StepFuture<'_> {
    async move { page.add_todos(&tasks).await }.boxed_local()
}

fn add_numbered_tasks(page: &TodoPage, n: usize) -> StepFuture<'_> {
    async move { page.add_todos((1..=n).map(|i| format!("Task {i}"))).await }.boxed_local()
}

fn complete_task(page: &TodoPage, task: String) -> StepFuture<'_> {
    async move { page.mark_completed(&task).await }.boxed_local()
}

fn unmark_task(page: &TodoPage, task: String) -> StepFuture<'_> {
    async move { page.unmark(&task).await }.boxed_local()
}

fn delete_task(page: &TodoPage, task: String) -> StepFuture<'_> {
    async move { page.delete_todo(&task).await }.boxed_local()
}

fn delete_all(page: &TodoPage) -> StepFuture<'_> {
    page.delete_all().boxed_local()
}

fn clear_completed(page: &TodoPage) -> StepFuture<'_> {
    page.clear_completed().boxed_local()
}

fn reload(page: &TodoPage) -> StepFuture<'_> {
    page.reload().boxed_local()
}

fn filter_all(page: &TodoPage) -> StepFuture<'_> {
    page.filter(Filter::All).boxed_local()
}

fn filter_active(page: &TodoPage) -> StepFuture<'_> {
    page.filter(Filter::Active).boxed_local()
}

fn filter_completed(page: &TodoPage) -> StepFuture<'_> {
    page.filter(Filter::Completed).boxed_local()
}

fn toggle_all(page: &TodoPage) -> StepFuture<'_> {
    page.toggle_all().boxed_local()
}

fn counter_shows(page: &TodoPage, expected: String) -> StepFuture<'_> {
    async move {
        let shown = page
            .interactions()
            .poll_until(|| page.todo_count(), |t| t.contains(expected.as_str()))
            .await?;
        check(shown.contains(expected.as_str()), || {
            format!("Counter should show \"{expected}\" but shows \"{shown}\"")
        })
    }
    .boxed_local()
}

fn list_empty(page: &TodoPage) -> StepFuture<'_> {
    async move {
        let count = page
            .interactions()
            .poll_until(|| page.todo_items_count(), |n| *n == 0)
            .await?;
        check(count == 0, || {
            format!("Task list should be empty but contains {count} task(s)")
        })
    }
    .boxed_local()
}

fn task_completed(page: &TodoPage, task: String) -> StepFuture<'_> {
    async move {
        let done = page
            .interactions()
            .poll_until(|| page.is_completed(&task), |c| *c)
            .await?;
        check(done, || {
            format!("Task \"{task}\" should be marked as completed but it is not")
        })
    }
    .boxed_local()
}

fn task_not_completed(page: &TodoPage, task: String) -> StepFuture<'_> {
    async move {
        let done = page
            .interactions()
            .poll_until(|| page.is_completed(&task), |c| !*c)
            .await?;
        check(!done, || {
            format!("Task \"{task}\" should not be marked as completed but it is")
        })
    }
    .boxed_local()
}

fn list_count(page: &TodoPage, expected: usize) -> StepFuture<'_> {
    async move {
        let found = page
            .interactions()
            .poll_until(|| page.todo_items_count(), |n| *n == expected)
            .await?;
        check(found == expected, || {
            format!("Expected to see {expected} tasks in the list but found {found}")
        })
    }
    .boxed_local()
}

fn visible_count(page: &TodoPage, expected: usize) -> StepFuture<'_> {
    async move {
        let found = page
            .interactions()
            .poll_until(|| page.visible_todos(), |v| v.len() == expected)
            .await?
            .len();
        check(found == expected, || {
            format!("Should see {expected} task(s) but found {found}")
        })
    }
    .boxed_local()
}

fn task_visible(page: &TodoPage, task: String) -> StepFuture<'_> {
    async move {
        let exists = page
            .interactions()
            .poll_until(|| page.todo_exists(&task), |e| *e)
            .await?;
        check(exists, || {
            format!("Task \"{task}\" should be visible in the list but was not found")
        })
    }
    .boxed_local()
}

fn task_not_visible(page: &TodoPage, task: String) -> StepFuture<'_> {
    async move {
        let exists = page
            .interactions()
            .poll_until(|| page.todo_exists(&task), |e| !*e)
            .await?;
        check(!exists, || {
            format!("Task \"{task}\" should not be visible in the list")
        })
    }
    .boxed_local()
}

fn counter_hidden(page: &TodoPage) -> StepFuture<'_> {
    async move {
        let visible = page
            .interactions()
            .poll_until(|| page.is_counter_visible(), |v| !*v)
            .await?;
        check(!visible, || {
            "Task counter should not be visible when list is empty".to_string()
        })
    }
    .boxed_local()
}

fn tasks_visible(page: &TodoPage, tasks: Vec<String>) -> StepFuture<'_> {
    async move {
        let current = page
            .interactions()
            .poll_until(
                || page.visible_todos(),
                |shown| tasks.iter().all(|t| shown.contains(t)),
            )
            .await?;
        for task in &tasks {
            check(current.contains(task), || {
                format!(
                    "Task \"{task}\" should be visible. Current tasks: [{}]",
                    current.join(", ")
                )
            })?;
        }
        Ok(())
    }
    .boxed_local()
}
