//! TodoMVC page object.

use crate::page::{Interactions, PageObject, WaitState};
use crate::result::{ProbeError, ProbeResult};
use crate::locator::Locator;

/// CSS selectors of the TodoMVC markup
pub mod selectors {
    /// New-task input
    pub const NEW_TODO: &str = ".new-todo";
    /// Task list
    pub const TODO_LIST: &str = ".todo-list";
    /// One task row
    pub const TODO_ITEM: &str = ".todo-list li";
    /// Class carried by completed rows
    pub const COMPLETED_CLASS: &str = "completed";
    /// Remaining-items counter
    pub const TODO_COUNT: &str = ".todo-count";
    /// "Clear completed" button
    pub const CLEAR_COMPLETED: &str = ".clear-completed";
    /// "All" filter link
    pub const FILTER_ALL: &str = "a[href=\"#/\"]";
    /// "Active" filter link
    pub const FILTER_ACTIVE: &str = "a[href=\"#/active\"]";
    /// "Completed" filter link
    pub const FILTER_COMPLETED: &str = "a[href=\"#/completed\"]";
    /// Toggle-all checkbox
    pub const TOGGLE_ALL: &str = ".toggle-all";
    /// Per-row checkbox
    pub const ROW_TOGGLE: &str = "input.toggle";
    /// Per-row delete button
    pub const ROW_DESTROY: &str = "button.destroy";
}

/// List filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Every task
    All,
    /// Open tasks
    Active,
    /// Done tasks
    Completed,
}

impl Filter {
    const fn selector(self) -> &'static str {
        match self {
            Self::All => selectors::FILTER_ALL,
            Self::Active => selectors::FILTER_ACTIVE,
            Self::Completed => selectors::FILTER_COMPLETED,
        }
    }

    /// Route fragment the filter link points at
    #[must_use]
    pub const fn fragment(self) -> &'static str {
        match self {
            Self::All => "#/",
            Self::Active => "#/active",
            Self::Completed => "#/completed",
        }
    }
}

/// Page object for the TodoMVC application
#[derive(Debug, Clone)]
pub struct TodoPage {
    page: Interactions,
}

impl PageObject for TodoPage {
    fn url_pattern(&self) -> &str {
        "/"
    }

    fn interactions(&self) -> &Interactions {
        &self.page
    }

    fn page_name(&self) -> &str {
        "TodoPage"
    }
}

impl TodoPage {
    /// Wrap an interaction helper
    #[must_use]
    pub const fn new(page: Interactions) -> Self {
        Self { page }
    }

    fn row(text: &str) -> Locator {
        Locator::new(selectors::TODO_ITEM).with_text(text).first()
    }

    /// Open the application and wait for the input
    pub async fn navigate(&self) -> ProbeResult<()> {
        self.page.navigate(self.url_pattern()).await?;
        self.page
            .wait_for_selector(&Locator::new(selectors::NEW_TODO))
            .await
    }

    /// Add one task.
    ///
    /// Waits on the remaining-items counter rather than the rows, since a
    /// new open task is not rendered while the completed filter is shown.
    pub async fn add_todo(&self, text: &str) -> ProbeResult<()> {
        let before = self.remaining_count().await?;
        let input = Locator::new(selectors::NEW_TODO);
        self.page.fill(&input, text).await?;
        self.page.press(&input, "Enter").await?;
        // The application ignores blank entries
        if text.trim().is_empty() {
            return Ok(());
        }
        let after = self
            .page
            .poll_until(|| self.remaining_count(), |n| *n > before)
            .await?;
        if after > before {
            Ok(())
        } else {
            Err(ProbeError::assertion(format!(
                "Task \"{text}\" was not added ({after} item(s) left)"
            )))
        }
    }

    /// Add tasks in order
    pub async fn add_todos<I, S>(&self, texts: I) -> ProbeResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for text in texts {
            self.add_todo(text.as_ref()).await?;
        }
        Ok(())
    }

    /// Check the task's checkbox
    pub async fn mark_completed(&self, text: &str) -> ProbeResult<()> {
        self.page
            .set_checked(&Self::row(text).locator(selectors::ROW_TOGGLE), true)
            .await
    }

    /// Uncheck the task's checkbox
    pub async fn unmark(&self, text: &str) -> ProbeResult<()> {
        self.page
            .set_checked(&Self::row(text).locator(selectors::ROW_TOGGLE), false)
            .await
    }

    /// Whether the task's row carries the completed class.
    ///
    /// A task that is not in the list is reported as not completed.
    pub async fn is_completed(&self, text: &str) -> ProbeResult<bool> {
        let rows = self.page.query_all(&Self::row(text)).await?;
        Ok(rows
            .first()
            .is_some_and(|row| row.has_class(selectors::COMPLETED_CLASS)))
    }

    /// Trimmed counter text, empty when the counter is absent
    pub async fn todo_count(&self) -> ProbeResult<String> {
        let counter = self
            .page
            .query_all(&Locator::new(selectors::TODO_COUNT))
            .await?;
        Ok(counter
            .first()
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default())
    }

    /// Open tasks according to the counter, 0 when the counter is absent
    pub async fn remaining_count(&self) -> ProbeResult<usize> {
        Ok(parse_remaining(&self.todo_count().await?))
    }

    /// Whether the counter is visible
    pub async fn is_counter_visible(&self) -> ProbeResult<bool> {
        self.page
            .is_visible(&Locator::new(selectors::TODO_COUNT))
            .await
    }

    /// Number of rows in the list, visible or not
    pub async fn todo_items_count(&self) -> ProbeResult<usize> {
        Ok(self
            .page
            .query_all(&Locator::new(selectors::TODO_ITEM))
            .await?
            .len())
    }

    /// Whether the list has no rows
    pub async fn is_list_empty(&self) -> ProbeResult<bool> {
        Ok(self.todo_items_count().await? == 0)
    }

    /// Delete a task through its hover-revealed button
    pub async fn delete_todo(&self, text: &str) -> ProbeResult<()> {
        let matching = Locator::new(selectors::TODO_ITEM).with_text(text);
        let before = self.page.query_all(&matching).await?.len();
        let row = Self::row(text);
        self.page.hover(&row).await?;
        self.page
            .click(&row.locator(selectors::ROW_DESTROY))
            .await?;
        let after = self
            .page
            .poll_until(|| self.page.query_all(&matching), |rows| rows.len() < before)
            .await?;
        if after.len() < before {
            Ok(())
        } else {
            Err(ProbeError::assertion(format!("task \"{text}\" was not deleted")))
        }
    }

    /// Delete every task, first row first
    pub async fn delete_all(&self) -> ProbeResult<()> {
        let mut remaining = self.todo_items_count().await?;
        while remaining > 0 {
            let first = self
                .page
                .text(&Locator::new(selectors::TODO_ITEM).first())
                .await?;
            self.delete_todo(first.trim()).await?;
            let now = self.todo_items_count().await?;
            if now >= remaining {
                return Err(ProbeError::assertion(format!(
                    "deleting \"{}\" did not shrink the list ({now} tasks remain)",
                    first.trim()
                )));
            }
            remaining = now;
        }
        Ok(())
    }

    /// Press "Clear completed" if it is shown
    pub async fn clear_completed(&self) -> ProbeResult<()> {
        let button = Locator::new(selectors::CLEAR_COMPLETED);
        if !self.page.is_visible(&button).await? {
            tracing::debug!("no completed tasks to clear");
            return Ok(());
        }
        self.page.click(&button).await?;
        self.page.wait_for(&button, WaitState::Hidden).await.map(|_| ())
    }

    /// Reload and wait for the input
    pub async fn reload(&self) -> ProbeResult<()> {
        self.page.reload().await?;
        self.page
            .wait_for_selector(&Locator::new(selectors::NEW_TODO))
            .await
    }

    /// Apply a list filter and wait for the route to change
    pub async fn filter(&self, filter: Filter) -> ProbeResult<()> {
        self.page.click(&Locator::new(filter.selector())).await?;
        let url = self
            .page
            .poll_until(|| self.page.url(), |url| url.ends_with(filter.fragment()))
            .await?;
        if url.ends_with(filter.fragment()) {
            Ok(())
        } else {
            Err(ProbeError::assertion(format!(
                "filter link did not route to {} (at {url})",
                filter.fragment()
            )))
        }
    }

    /// Whether a visible row has exactly this text
    pub async fn todo_exists(&self, text: &str) -> ProbeResult<bool> {
        Ok(self.visible_todos().await?.iter().any(|t| t == text))
    }

    /// Trimmed texts of the visible rows, in list order
    pub async fn visible_todos(&self) -> ProbeResult<Vec<String>> {
        Ok(self
            .page
            .query_all(&Locator::new(selectors::TODO_ITEM))
            .await?
            .into_iter()
            .filter(|row| row.visible)
            .map(|row| row.text.trim().to_string())
            .collect())
    }

    /// Click the toggle-all checkbox
    pub async fn toggle_all(&self) -> ProbeResult<()> {
        self.page.click(&Locator::new(selectors::TOGGLE_ALL)).await
    }
}

/// Leading number of a "N item(s) left" counter
fn parse_remaining(counter: &str) -> usize {
    counter
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}
