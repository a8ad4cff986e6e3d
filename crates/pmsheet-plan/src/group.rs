//! Grouping by location and status group

use std::collections::BTreeMap;

use pmsheet_core::{ClassifiedRow, GroupKey};

/// Rows per group, ordered by key text
pub type Groups<'a> = BTreeMap<GroupKey, Vec<&'a ClassifiedRow>>;

/// Partition classified rows by [`GroupKey`], keeping input order within a
/// group
pub fn group_rows<'a, I>(rows: I) -> Groups<'a>
where
    I: IntoIterator<Item = &'a ClassifiedRow>,
{
    let mut groups: Groups<'a> = BTreeMap::new();
    for row in rows {
        groups.entry(GroupKey::for_row(row)).or_default().push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsheet_core::{Field, SourceRow, StatusGroup};
    use pretty_assertions::assert_eq;

    fn classified(line: usize, location: &str, group: StatusGroup) -> ClassifiedRow {
        ClassifiedRow::new(SourceRow::new(line).with(Field::Location, location), group)
    }

    #[test]
    fn groups_by_location_and_status() {
        let rows = vec![
            classified(2, "SiteB", StatusGroup::Accepted),
            classified(3, "SiteA", StatusGroup::Accepted),
            classified(4, "SiteB", StatusGroup::OnHold),
            classified(5, "SiteB", StatusGroup::Accepted),
            classified(6, "SiteA", StatusGroup::Bess),
        ];
        let groups = group_rows(&rows);

        let keys: Vec<&str> = groups.keys().map(GroupKey::as_str).collect();
        assert_eq!(keys, vec!["SiteA", "SiteA_BESS", "SiteB", "SiteB_OnHold"]);

        let site_b: Vec<usize> = groups[&GroupKey::new(&"SiteB".into(), StatusGroup::Accepted)]
            .iter()
            .map(|r| r.row.line)
            .collect();
        assert_eq!(site_b, vec![2, 5]);
    }

    #[test]
    fn regrouping_is_idempotent() {
        let rows = vec![
            classified(2, "X", StatusGroup::Accepted),
            classified(3, "Y", StatusGroup::OnHold),
            classified(4, "X", StatusGroup::Accepted),
        ];
        let first = group_rows(&rows);
        let second = group_rows(first.values().flatten().copied());
        assert_eq!(first, second);
    }
}
