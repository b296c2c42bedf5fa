//! Per-image durations for ramped practice modes.
//!
//! All arithmetic is done on `i64` with floor division so that the visible
//! schedule is identical between runs and platforms.

use crate::session::PracticeMode;

/// Computes the ordered per-image durations for `mode`.
///
/// Non-ramped modes (and an empty set) get an empty schedule: the caller
/// uses the fixed per-image duration instead. When the budget cannot cover
/// `minimum` seconds per image the schedule degrades to `image_count` copies
/// of `minimum`.
pub fn plan(mode: PracticeMode, image_count: usize, total_secs: u32, minimum_secs: u32) -> Vec<u32> {
    if !mode.is_ramped() || image_count == 0 {
        return Vec::new();
    }

    let count = image_count as i64;
    let total = i64::from(total_secs);
    let minimum = i64::from(minimum_secs);
    let average = total.div_euclid(count);

    if average < minimum {
        return vec![minimum_secs; image_count];
    }

    let mut durations = if count == 1 {
        vec![average.max(minimum)]
    } else {
        progression(count, average, minimum)
    };

    rebalance(&mut durations, total);
    for d in durations.iter_mut() {
        *d = (*d).max(minimum);
    }
    settle(&mut durations, total, minimum);

    let mut durations: Vec<u32> = durations
        .into_iter()
        .map(|d| u32::try_from(d).unwrap_or(u32::MAX))
        .collect();

    if mode == PracticeMode::Speed {
        durations.reverse();
    }
    durations
}

/// Arithmetic progression centred near `average`, first term at least `minimum`.
fn progression(count: i64, average: i64, minimum: i64) -> Vec<i64> {
    let step = ((average - minimum) * 2).div_euclid(count - 1).max(1);
    let first = (average - ((count - 1) * step).div_euclid(2)).max(minimum);

    (0..count).map(|i| first + i * step).collect()
}

/// Spreads the signed gap between the sum and `total` over every term; the
/// remainder goes to the first terms.
fn rebalance(durations: &mut [i64], total: i64) {
    let count = durations.len() as i64;
    let diff = total - durations.iter().sum::<i64>();
    let adjustment = diff.div_euclid(count);
    let remainder = diff.rem_euclid(count);

    for (i, d) in durations.iter_mut().enumerate() {
        *d += adjustment + i64::from((i as i64) < remainder);
    }
}

/// Flooring terms at `minimum` can push the sum over budget. Cap the largest
/// terms at a common level so the total is met again, keeping the sequence
/// non-decreasing.
fn settle(durations: &mut [i64], total: i64, minimum: i64) {
    let capped_sum = |level: i64| durations.iter().map(|d| (*d).min(level)).sum::<i64>();

    if durations.iter().sum::<i64>() <= total {
        return;
    }

    // largest level whose capped sum still fits the budget
    let (mut lo, mut hi) = (minimum, durations.iter().copied().max().unwrap_or(minimum));
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if capped_sum(mid) <= total {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    let level = lo;
    let mut leftover = total - capped_sum(level);
    for d in durations.iter_mut() {
        *d = (*d).min(level);
    }
    // the tail holds the capped terms; topping them up keeps the order
    for d in durations.iter_mut().rev() {
        if leftover == 0 {
            break;
        }
        if *d == level {
            *d += 1;
            leftover -= 1;
        }
    }
}

/// Upper bound on how many images a ramped session can show.
pub fn session_image_limit(total_secs: u32, minimum_secs: u32) -> usize {
    if minimum_secs == 0 {
        return 0;
    }
    (total_secs / minimum_secs) as usize
}

/// What the idle screen shows about the upcoming schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePreview {
    pub images_used: usize,
    pub images_available: usize,
    pub first_secs: Option<u32>,
    pub last_secs: Option<u32>,
}

impl SchedulePreview {
    pub fn new(mode: PracticeMode, available: usize, total_secs: u32, minimum_secs: u32) -> Self {
        let images_used = if mode.is_ramped() {
            available.min(session_image_limit(total_secs, minimum_secs))
        } else {
            available
        };
        let durations = plan(mode, images_used, total_secs, minimum_secs);

        Self {
            images_used,
            images_available: available,
            first_secs: durations.first().copied(),
            last_secs: durations.last().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_non_decreasing(v: &[u32]) -> bool {
        v.windows(2).all(|w| w[0] <= w[1])
    }

    fn is_non_increasing(v: &[u32]) -> bool {
        v.windows(2).all(|w| w[0] >= w[1])
    }

    #[test]
    fn normal_mode_has_no_schedule() {
        assert!(plan(PracticeMode::Normal, 10, 600, 5).is_empty());
        assert!(plan(PracticeMode::Zen, 10, 600, 5).is_empty());
    }

    #[test]
    fn empty_set_has_no_schedule() {
        assert!(plan(PracticeMode::Precision, 0, 600, 5).is_empty());
    }

    #[test]
    fn tight_budget_degrades_to_floor() {
        // 40 / 10 = 4 < 5
        assert_eq!(plan(PracticeMode::Precision, 10, 40, 5), vec![5; 10]);
        assert_eq!(plan(PracticeMode::Speed, 3, 14, 5), vec![5; 3]);
    }

    #[test]
    fn precision_sixty_seconds_over_ten_images() {
        let d = plan(PracticeMode::Precision, 10, 60, 5);
        assert_eq!(d.len(), 10);
        assert_eq!(d.iter().sum::<u32>(), 60);
        assert!(is_non_decreasing(&d));
        assert!(d.iter().all(|&x| x >= 5));
        assert_eq!(d, vec![5, 5, 5, 5, 6, 6, 7, 7, 7, 7]);
    }

    #[test]
    fn speed_is_reverse_of_precision() {
        for (count, total) in [(1, 60), (2, 60), (5, 300), (10, 600), (37, 1800), (100, 600)] {
            let precision = plan(PracticeMode::Precision, count, total, 5);
            let mut speed = plan(PracticeMode::Speed, count, total, 5);
            assert!(is_non_increasing(&speed));
            speed.reverse();
            assert_eq!(precision, speed, "count={count} total={total}");
        }
    }

    #[test]
    fn sums_stay_within_image_count_of_budget() {
        for count in 1..=120usize {
            for total in [60u32, 300, 600, 1800, 3600] {
                if (total as usize) / count < 5 {
                    continue;
                }
                let d = plan(PracticeMode::Precision, count, total, 5);
                let sum: i64 = d.iter().map(|&x| i64::from(x)).sum();
                assert!(
                    (sum - i64::from(total)).abs() <= count as i64,
                    "count={count} total={total} sum={sum}"
                );
                assert!(is_non_decreasing(&d), "count={count} total={total}");
                assert!(d.iter().all(|&x| x >= 5));
            }
        }
    }

    #[test]
    fn single_image_gets_whole_budget() {
        assert_eq!(plan(PracticeMode::Precision, 1, 90, 5), vec![90]);
        assert_eq!(plan(PracticeMode::Speed, 1, 7, 5), vec![7]);
    }

    #[test]
    fn two_images_ramp() {
        let d = plan(PracticeMode::Precision, 2, 60, 5);
        assert_eq!(d.iter().sum::<u32>(), 60);
        assert!(d[0] < d[1]);
    }

    #[test]
    fn plan_is_deterministic() {
        let a = plan(PracticeMode::Speed, 23, 1200, 5);
        let b = plan(PracticeMode::Speed, 23, 1200, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn preview_caps_images_for_ramped_modes() {
        let p = SchedulePreview::new(PracticeMode::Precision, 50, 60, 5);
        assert_eq!(p.images_used, 12);
        assert_eq!(p.images_available, 50);
        assert!(p.first_secs.unwrap() <= p.last_secs.unwrap());

        let n = SchedulePreview::new(PracticeMode::Normal, 50, 60, 5);
        assert_eq!(n.images_used, 50);
        assert_eq!(n.first_secs, None);
    }

    #[test]
    fn image_limit() {
        assert_eq!(session_image_limit(600, 5), 120);
        assert_eq!(session_image_limit(4, 5), 0);
        assert_eq!(session_image_limit(60, 0), 0);
    }
}
