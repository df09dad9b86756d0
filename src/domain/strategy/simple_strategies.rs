use crate::domain::environment::data_unit::DataUnit;

/// Oldest first: the head of the buffer.
pub fn select_oldest_first<'a>(units: impl IntoIterator<Item = &'a DataUnit>) -> Option<usize> {
    units.into_iter().next().map(|_| 0)
}

/// Minimum remaining lifetime first. Ties go to the unit inserted first.
pub fn select_min_lifetime_first<'a>(units: impl IntoIterator<Item = &'a DataUnit>) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;

    for (index, unit) in units.into_iter().enumerate() {
        match best {
            Some((_, lifetime)) if lifetime <= unit.remaining_lifetime => {}
            _ => best = Some((index, unit.remaining_lifetime)),
        }
    }

    best.map(|(index, _)| index)
}
