//! Read-only summaries the dashboard, course list and calendar draw from a
//! forest snapshot. Nothing here mutates the forest.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::forest::Forest;
use crate::model::{Course, Progress};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Rounded mean of every course's progress; zero for an empty forest.
#[must_use]
pub fn overall_progress(forest: &Forest) -> Progress {
    Progress::mean(forest.iter().map(Course::progress))
}

#[must_use]
pub fn subject_count(forest: &Forest) -> usize {
    forest.iter().map(|c| c.subjects().len()).sum()
}

/// Whole days until the deadline, rounding any partial day up.
///
/// Zero or negative once the deadline has passed.
#[must_use]
pub fn days_left(course: &Course, now: DateTime<Utc>) -> i64 {
    let millis = (course.deadline() - now).num_milliseconds();
    let days = millis / MILLIS_PER_DAY;
    if millis % MILLIS_PER_DAY > 0 {
        days + 1
    } else {
        days
    }
}

fn by_deadline(forest: &Forest) -> Vec<&Course> {
    let mut courses: Vec<&Course> = forest.iter().collect();
    courses.sort_by_key(|c| c.deadline());
    courses
}

/// Courses due in `[now, now + within)`, soonest first.
#[must_use]
pub fn upcoming_deadlines(
    forest: &Forest,
    now: DateTime<Utc>,
    within: Duration,
    limit: usize,
) -> Vec<&Course> {
    let horizon = now + within;
    by_deadline(forest)
        .into_iter()
        .filter(|c| c.deadline() >= now && c.deadline() < horizon)
        .take(limit)
        .collect()
}

/// Courses under half done with a deadline less than two weeks out.
#[must_use]
pub fn needs_attention(forest: &Forest, now: DateTime<Utc>, limit: usize) -> Vec<&Course> {
    by_deadline(forest)
        .into_iter()
        .filter(|c| {
            let days = days_left(c, now);
            c.progress().value() < 50 && days > 0 && days < 14
        })
        .take(limit)
        .collect()
}

/// Most recently created courses first.
#[must_use]
pub fn recent_courses(forest: &Forest, limit: usize) -> Vec<&Course> {
    let mut courses: Vec<&Course> = forest.iter().collect();
    courses.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    courses.truncate(limit);
    courses
}

/// Courses whose deadline falls on the given (UTC) calendar day.
#[must_use]
pub fn deadlines_on(forest: &Forest, day: NaiveDate) -> Vec<&Course> {
    forest
        .iter()
        .filter(|c| c.deadline().date_naive() == day)
        .collect()
}

/// Every calendar day that carries at least one deadline.
#[must_use]
pub fn deadline_days(forest: &Forest) -> BTreeSet<NaiveDate> {
    forest.iter().map(|c| c.deadline().date_naive()).collect()
}

/// Case-insensitive match on course name or description. A blank term matches everything.
#[must_use]
pub fn search<'a>(forest: &'a Forest, term: &str) -> Vec<&'a Course> {
    let needle = term.trim().to_lowercase();
    forest
        .iter()
        .filter(|c| {
            c.name().as_str().to_lowercase().contains(&needle)
                || c.description().to_lowercase().contains(&needle)
        })
        .collect()
}

#[must_use]
pub fn progress_label(progress: Progress) -> &'static str {
    match progress.value() {
        75.. => "Excellent progress!",
        50..=74 => "Good progress",
        _ => "Keep going!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn forest_with(deadlines: &[(&str, i64)]) -> Forest {
        let mut forest = Forest::new();
        let now = fixed_now();
        for (i, (name, hours)) in deadlines.iter().enumerate() {
            let created = now + Duration::minutes(i64::try_from(i).unwrap());
            forest
                .create_course(name, "", now + Duration::hours(*hours), created)
                .unwrap();
        }
        forest
    }

    fn names(courses: &[&Course]) -> Vec<String> {
        courses.iter().map(|c| c.name().to_string()).collect()
    }

    #[test]
    fn days_left_rounds_partial_days_up() {
        let forest = forest_with(&[("a", 1), ("b", 48), ("c", -30)]);
        let now = fixed_now();
        let days: Vec<i64> = forest.iter().map(|c| days_left(c, now)).collect();
        assert_eq!(days, vec![1, 2, -1]);
    }

    #[test]
    fn upcoming_is_sorted_bounded_and_limited() {
        let forest = forest_with(&[
            ("late", 24 * 6),
            ("past", -1),
            ("soon", 2),
            ("far", 24 * 8),
            ("mid", 24 * 3),
        ]);
        let picked = upcoming_deadlines(&forest, fixed_now(), Duration::days(7), 3);
        assert_eq!(names(&picked), vec!["soon", "mid", "late"]);

        let picked = upcoming_deadlines(&forest, fixed_now(), Duration::days(7), 1);
        assert_eq!(names(&picked), vec!["soon"]);
    }

    #[test]
    fn needs_attention_requires_low_progress_and_close_deadline() {
        let mut forest = forest_with(&[("close", 24 * 5), ("distant", 24 * 20), ("overdue", -5)]);
        let close = forest.courses()[0].id().clone();
        let picked = needs_attention(&forest, fixed_now(), 3);
        assert_eq!(names(&picked), vec!["close"]);

        let subject = forest.create_subject(&close, "All").unwrap();
        let chapter = forest.create_chapter(&close, &subject, "One").unwrap();
        let topic = forest.create_topic(&close, &subject, &chapter, "Only").unwrap();
        forest
            .set_topic_completed(&close, &subject, &chapter, &topic, true)
            .unwrap();
        assert!(needs_attention(&forest, fixed_now(), 3).is_empty());
    }

    #[test]
    fn recent_courses_newest_first() {
        let forest = forest_with(&[("first", 10), ("second", 10), ("third", 10)]);
        let picked = recent_courses(&forest, 2);
        assert_eq!(names(&picked), vec!["third", "second"]);
    }

    #[test]
    fn calendar_groups_by_utc_day() {
        // fixed_now is 22:13 UTC, so +3h is already the next calendar day.
        let forest = forest_with(&[
            ("tonight", 1),
            ("after midnight", 3),
            ("tomorrow morning", 5),
            ("next week", 24 * 7),
        ]);
        let next_day = (fixed_now() + Duration::hours(3)).date_naive();
        assert_eq!(
            names(&deadlines_on(&forest, next_day)),
            vec!["after midnight", "tomorrow morning"]
        );
        assert_eq!(deadline_days(&forest).len(), 3);
    }

    #[test]
    fn search_matches_name_or_description_ignoring_case() {
        let mut forest = Forest::new();
        let now = fixed_now();
        forest.create_course("Organic Chemistry", "", now, now).unwrap();
        forest.create_course("Biology", "cell CHEMISTRY basics", now, now).unwrap();
        forest.create_course("History", "", now, now).unwrap();

        assert_eq!(names(&search(&forest, "chem")), vec!["Organic Chemistry", "Biology"]);
        assert_eq!(search(&forest, "  ").len(), 3);
    }

    #[test]
    fn overall_progress_and_labels() {
        let forest = forest_with(&[("a", 1), ("b", 2)]);
        assert_eq!(overall_progress(&forest), Progress::ZERO);
        assert_eq!(overall_progress(&Forest::new()), Progress::ZERO);
        assert_eq!(subject_count(&forest), 0);
        assert_eq!(progress_label(Progress::clamped(80)), "Excellent progress!");
        assert_eq!(progress_label(Progress::clamped(50)), "Good progress");
        assert_eq!(progress_label(Progress::clamped(49)), "Keep going!");
    }
}
