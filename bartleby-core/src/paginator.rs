//! Page composition over two query executions
//!
//! A page is assembled from a COUNT re-projection of the accumulated state
//! followed by the original query with LIMIT/OFFSET applied. The paginator
//! carries no state of its own beyond the assembled descriptor.

use serde::Serialize;

use crate::builder::{Projection, QueryBuilder};
use crate::executor::{Connection, Executor, Outcome, PreparedQuery, StatementKind};
use crate::grammar;
use crate::value::Record;

/// A neighbor-page reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub exists: bool,
    pub page: u64,
}

/// One page of results plus the surrounding navigation facts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub first_page: u64,
    pub prev_page: PageLink,
    pub current_page: u64,
    pub next_page: PageLink,
    pub last_page: u64,
    pub total_pages: u64,
    pub total_results: u64,
    pub per_page: u64,
    pub results: Vec<Record>,
}

impl QueryBuilder {
    /// Execute the accumulated query as a page.
    ///
    /// `per_page` is floored to 1 and the requested page to 1. A page beyond
    /// the last returns an empty result set without faulting, and a failed
    /// count degrades to an empty page.
    pub fn paginate<C: Connection>(
        &mut self,
        exec: &mut Executor<C>,
        page: i64,
        per_page: i64,
    ) -> Page {
        let per_page = per_page.max(1) as u64;
        let current_page = page.max(1) as u64;

        // COUNT re-projection over the same predicates and joins. Ordering
        // and paging do not affect the count and are cleared.
        let mut count_state = self.state.clone();
        count_state.columns = vec![Projection::Column("COUNT(*) AS aggregate".to_string())];
        count_state.order_by.clear();
        count_state.limit = None;
        count_state.offset = None;
        let sql = grammar::render_select(&count_state);
        let bindings = count_state.bindings.flatten_count();
        let mut count_query = PreparedQuery::with_kind(sql, bindings, StatementKind::Select);
        let total_results = match exec.run(&mut count_query) {
            Outcome::Rows(rows) => rows
                .first()
                .and_then(|row| row.get("aggregate"))
                .and_then(|value| value.as_u64())
                .unwrap_or(0),
            _ => 0,
        };

        let total_pages = (total_results + per_page - 1) / per_page;

        self.limit(per_page)
            .offset(((current_page - 1) * per_page) as i64);
        let mut select = self.render_select();
        let results = match exec.run(&mut select) {
            Outcome::Rows(rows) => rows,
            _ => Vec::new(),
        };
        self.reset();

        Page {
            first_page: 1,
            prev_page: PageLink {
                exists: total_pages > 0 && current_page > 1,
                page: current_page.saturating_sub(1).max(1),
            },
            current_page,
            next_page: PageLink {
                exists: current_page < total_pages,
                page: (current_page + 1).min(total_pages.max(1)),
            },
            last_page: total_pages,
            total_pages,
            total_results,
            per_page,
            results,
        }
    }
}
