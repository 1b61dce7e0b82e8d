/// Derived view state computed from raw catalog records.
///
/// Everything here is a pure function of its input: no clocks, no I/O, no
/// hash-ordered iteration, so two runs over the same state serialize to the
/// same bytes.
use serde::Serialize;

use crate::{
    models::{CatalogItem, Notification, RecommendationCandidate, WatchStatus},
    state::{AppStateInner, ItemView, Notice, PendingOp},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonRollup {
    pub watched: u32,
    pub total: u32,
    pub progress_ratio: f64,
}

pub fn season_rollup(item: &CatalogItem) -> SeasonRollup {
    let total = item.seasons.len() as u32;
    let watched = item
        .seasons
        .iter()
        .filter(|s| s.watch_status == WatchStatus::Watched)
        .count() as u32;
    let progress_ratio = if total == 0 {
        0.0
    } else {
        f64::from(watched) / f64::from(total)
    };

    SeasonRollup {
        watched,
        total,
        progress_ratio,
    }
}

/// Distinct non-blank contributors, sorted ascending and case-sensitively.
///
/// Names are kept exactly as stored so that a filter built from one
/// matches the remote store.
pub fn contributors<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a CatalogItem>,
{
    let mut names: Vec<String> = items
        .into_iter()
        .filter_map(|item| item.added_by.as_deref())
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// A watched series never shows a stale "new season" badge
pub fn shows_new_season_badge(item: &CatalogItem) -> bool {
    item.has_new_seasons && item.watch_status == WatchStatus::Unwatched
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedItem {
    #[serde(flatten)]
    pub item: CatalogItem,
    /// Server roll-up for series, stored status for movies
    pub display_status: WatchStatus,
    pub rollup: Option<SeasonRollup>,
    pub new_season_badge: bool,
    pub deleted: bool,
    pub pending: Option<PendingOp>,
    pub actions_enabled: bool,
    pub remove_season_enabled: bool,
}

impl DerivedItem {
    pub fn from_view(view: &ItemView) -> Self {
        let item = &view.item;
        let rollup = item.is_series().then(|| season_rollup(item));
        let actions_enabled = !view.is_inert();

        Self {
            item: item.clone(),
            display_status: item.watch_status,
            new_season_badge: item.is_series() && shows_new_season_badge(item),
            deleted: view.deleted,
            pending: view.pending,
            actions_enabled,
            remove_season_enabled: actions_enabled && rollup.is_some_and(|r| r.total > 1),
            rollup,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogView {
    pub items: Vec<DerivedItem>,
    pub contributors: Vec<String>,
    pub notifications: Vec<Notification>,
    pub recommendations: Vec<RecommendationCandidate>,
    pub notices: Vec<Notice>,
    pub loading: bool,
}

pub fn derive_catalog(state: &AppStateInner) -> CatalogView {
    CatalogView {
        items: state.catalog.iter().map(DerivedItem::from_view).collect(),
        contributors: state.contributors.clone().unwrap_or_default(),
        notifications: state.notifications.clone(),
        recommendations: state.recommendations.clone(),
        notices: state.notices.clone(),
        loading: state.loading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, ItemId, Season};

    fn item(id: &str, kind: ContentType, added_by: Option<&str>) -> CatalogItem {
        CatalogItem {
            id: ItemId::from(id),
            content_type: kind,
            title: id.to_uppercase(),
            cover_image: None,
            link: None,
            link_description: None,
            comment: None,
            added_by: added_by.map(str::to_string),
            genres: vec!["Drama".to_string()],
            priority: 2,
            length: None,
            watch_status: WatchStatus::Unwatched,
            date_added: None,
            seasons: Vec::new(),
            has_new_seasons: false,
            total_available_seasons: None,
            series_status: None,
        }
    }

    fn series_with(statuses: &[WatchStatus]) -> CatalogItem {
        let mut series = item("s1", ContentType::Series, None);
        series.seasons = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| Season {
                season_number: i as u32 + 1,
                watch_status: *status,
            })
            .collect();
        series
    }

    #[test]
    fn test_rollup_counts_watched_seasons() {
        let series = series_with(&[
            WatchStatus::Unwatched,
            WatchStatus::Watched,
            WatchStatus::Unwatched,
        ]);
        let rollup = season_rollup(&series);
        assert_eq!(rollup.watched, 1);
        assert_eq!(rollup.total, 3);
        assert!((rollup.progress_ratio - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rollup_without_seasons_is_zero() {
        let rollup = season_rollup(&series_with(&[]));
        assert_eq!(rollup.total, 0);
        assert_eq!(rollup.progress_ratio, 0.0);
    }

    #[test]
    fn test_display_status_is_not_inferred_from_seasons() {
        // Every season watched, but the server roll-up still says unwatched
        let series = series_with(&[WatchStatus::Watched, WatchStatus::Watched]);
        let derived = DerivedItem::from_view(&ItemView::new(series));
        assert_eq!(derived.display_status, WatchStatus::Unwatched);
    }

    #[test]
    fn test_contributors_sorted_distinct_case_sensitive() {
        let items = vec![
            item("a", ContentType::Movie, Some("bob")),
            item("b", ContentType::Movie, Some("Alice")),
            item("c", ContentType::Movie, Some("  ")),
            item("d", ContentType::Movie, None),
            item("e", ContentType::Series, Some("Alice")),
            item("f", ContentType::Series, Some("Bob")),
        ];
        assert_eq!(contributors(&items), vec!["Alice", "Bob", "bob"]);
    }

    #[test]
    fn test_contributors_keep_stored_spelling() {
        let items = vec![
            item("a", ContentType::Movie, Some("Zoe ")),
            item("b", ContentType::Movie, Some("Zoe")),
        ];
        assert_eq!(contributors(&items), vec!["Zoe", "Zoe "]);
    }

    #[test]
    fn test_new_season_badge_hidden_when_watched() {
        let mut series = series_with(&[WatchStatus::Watched]);
        series.has_new_seasons = true;
        assert!(shows_new_season_badge(&series));

        series.watch_status = WatchStatus::Watched;
        assert!(!shows_new_season_badge(&series));
    }

    #[test]
    fn test_inert_items_disable_actions() {
        let series = series_with(&[WatchStatus::Unwatched, WatchStatus::Unwatched]);
        let mut view = ItemView::new(series);
        assert!(DerivedItem::from_view(&view).remove_season_enabled);

        view.deleted = true;
        let derived = DerivedItem::from_view(&view);
        assert!(!derived.actions_enabled);
        assert!(!derived.remove_season_enabled);

        let single = ItemView::new(series_with(&[WatchStatus::Unwatched]));
        assert!(!DerivedItem::from_view(&single).remove_season_enabled);
    }

    #[test]
    fn test_derivation_is_byte_identical_on_repeat() {
        let mut state = AppStateInner::default();
        state.catalog = vec![
            ItemView::new(series_with(&[WatchStatus::Watched, WatchStatus::Unwatched])),
            ItemView::new(item("m1", ContentType::Movie, Some("Carol"))),
        ];
        state.contributors = Some(contributors(state.catalog.iter().map(|v| &v.item)));

        let first = serde_json::to_vec(&derive_catalog(&state)).unwrap();
        let second = serde_json::to_vec(&derive_catalog(&state)).unwrap();
        assert_eq!(first, second);
    }
}
