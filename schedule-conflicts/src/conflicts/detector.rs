use std::collections::{HashMap, HashSet};

use super::types::{Appointment, ConflictGroup, Person};

/// Appointment id -> appointment, for the batch under consideration
pub type BatchIndex<'a, T> = HashMap<&'a str, &'a Appointment<T>>;

/// Indexes a batch by id. When two records share an id, the first one wins.
pub fn index_batch<T>(appointments: &[Appointment<T>]) -> BatchIndex<'_, T> {
    let mut index = HashMap::with_capacity(appointments.len());
    for appointment in appointments {
        index.entry(appointment.id.as_str()).or_insert(appointment);
    }
    index
}

/// Resolves a person's links against the batch, in link order.
/// Unresolved and repeated ids are dropped.
pub fn resolve_appointments<'a, T>(
    person: &Person,
    index: &BatchIndex<'a, T>,
) -> Vec<&'a Appointment<T>> {
    let mut seen = HashSet::new();
    person
        .appointment_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| index.get(id.as_str()).copied())
        .collect()
}

/// Returns every pair of a person's appointments that overlap.
/// Each unordered pair is evaluated exactly once, earlier link first.
pub fn conflicting_pairs<'a, T: PartialOrd>(
    person: &Person,
    index: &BatchIndex<'a, T>,
) -> Vec<(&'a Appointment<T>, &'a Appointment<T>)> {
    let resolved = resolve_appointments(person, index);
    let mut pairs = Vec::new();

    for (i, first) in resolved.iter().enumerate() {
        for second in &resolved[i + 1..] {
            if first.overlaps(second) {
                pairs.push((*first, *second));
            }
        }
    }

    pairs
}

/// Builds the conflict group for one person, or `None` if nothing of theirs overlaps
pub fn detect_for_person<T: PartialOrd + Clone>(
    person: &Person,
    index: &BatchIndex<'_, T>,
) -> Option<ConflictGroup<T>> {
    // Keyed by id so an appointment that collides with several others shows once
    let mut seen: HashSet<&str> = HashSet::new();
    let mut conflicting = Vec::new();

    for (first, second) in conflicting_pairs(person, index) {
        for appointment in [first, second] {
            if seen.insert(appointment.id.as_str()) {
                conflicting.push(appointment.clone());
            }
        }
    }

    if conflicting.is_empty() {
        return None;
    }

    Some(ConflictGroup {
        person: person.display_name.clone(),
        person_id: person.id.clone(),
        conflicting_appointments: conflicting,
    })
}

/// Detects scheduling conflicts for every person against one batch of appointments.
///
/// Returns one group per person with at least one overlapping pair, in the
/// same order as `people`. Appointments outside the batch are treated as
/// non-existent even if linked.
pub fn detect<T: PartialOrd + Clone>(
    people: &[Person],
    appointments: &[Appointment<T>],
) -> Vec<ConflictGroup<T>> {
    let index = index_batch(appointments);
    people
        .iter()
        .filter_map(|person| detect_for_person(person, &index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    fn appt(id: &str, start: (u32, u32), end: (u32, u32)) -> Appointment {
        Appointment::new(id, at(start.0, start.1), at(end.0, end.1))
    }

    fn ids<T>(group: &ConflictGroup<T>) -> Vec<&str> {
        let mut ids: Vec<&str> = group
            .conflicting_appointments
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_empty_inputs() {
        let groups: Vec<ConflictGroup> = detect(&[], &[]);
        assert!(groups.is_empty());

        let people = vec![Person::new("p1", "Ada", ["a1"])];
        let groups: Vec<ConflictGroup> = detect(&people, &[]);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_touching_appointments_are_not_conflicts() {
        let appointments = vec![appt("a1", (9, 0), (10, 0)), appt("a2", (10, 0), (11, 0))];
        let people = vec![Person::new("p1", "Ada", ["a1", "a2"])];
        assert!(detect(&people, &appointments).is_empty());
    }

    #[test]
    fn test_strict_overlap() {
        let appointments = vec![appt("a1", (9, 0), (10, 0)), appt("a2", (9, 30), (10, 30))];
        let people = vec![Person::new("p1", "Ada", ["a1", "a2"])];

        let groups = detect(&people, &appointments);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].person, "Ada");
        assert_eq!(groups[0].person_id, "p1");
        assert_eq!(ids(&groups[0]), vec!["a1", "a2"]);
    }

    #[test]
    fn test_containment_in_either_link_order() {
        let appointments = vec![appt("outer", (9, 0), (12, 0)), appt("inner", (10, 0), (11, 0))];

        let people = vec![Person::new("p1", "Ada", ["outer", "inner"])];
        assert_eq!(ids(&detect(&people, &appointments)[0]), vec!["inner", "outer"]);

        let people = vec![Person::new("p1", "Ada", ["inner", "outer"])];
        assert_eq!(ids(&detect(&people, &appointments)[0]), vec!["inner", "outer"]);
    }

    #[test]
    fn test_link_order_decides_asymmetric_pair() {
        // A point on the closing bound of a range: only the containment clause can
        // fire, and only when the point is the first interval
        let appointments = vec![appt("range", (9, 0), (12, 0)), appt("point", (12, 0), (12, 0))];

        let people = vec![Person::new("p1", "Ada", ["point", "range"])];
        let groups = detect(&people, &appointments);
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec!["point", "range"]);

        let people = vec![Person::new("p1", "Ada", ["range", "point"])];
        assert!(detect(&people, &appointments).is_empty());
    }

    #[test]
    fn test_identical_intervals_conflict() {
        let appointments = vec![appt("a1", (9, 0), (10, 0)), appt("a2", (9, 0), (10, 0))];
        let people = vec![Person::new("p1", "Ada", ["a1", "a2"])];
        assert_eq!(ids(&detect(&people, &appointments)[0]), vec!["a1", "a2"]);
    }

    #[test]
    fn test_appointment_listed_once_when_colliding_with_many() {
        let appointments = vec![
            appt("long", (8, 0), (17, 0)),
            appt("a", (9, 0), (10, 0)),
            appt("b", (11, 0), (12, 0)),
            appt("c", (13, 0), (14, 0)),
        ];
        let people = vec![Person::new("p1", "Ada", ["long", "a", "b", "c"])];

        let groups = detect(&people, &appointments);
        assert_eq!(groups[0].conflicting_appointments.len(), 4);
        assert_eq!(ids(&groups[0]), vec!["a", "b", "c", "long"]);
    }

    #[test]
    fn test_only_conflicting_appointments_reported() {
        let appointments = vec![
            appt("a1", (9, 0), (10, 0)),
            appt("a2", (9, 30), (10, 30)),
            appt("free", (14, 0), (15, 0)),
        ];
        let people = vec![Person::new("p1", "Ada", ["a1", "a2", "free"])];

        let groups = detect(&people, &appointments);
        assert!(!groups[0].contains("free"));
        assert!(groups[0].contains("a1"));
        assert!(groups[0].contains("a2"));
    }

    #[test]
    fn test_no_self_comparison() {
        let appointments = vec![appt("a1", (9, 0), (10, 0))];
        let people = vec![Person::new("p1", "Ada", ["a1"])];
        assert!(detect(&people, &appointments).is_empty());

        // A repeated link must not pair an appointment with itself
        let people = vec![Person::new("p1", "Ada", ["a1", "a1"])];
        assert!(detect(&people, &appointments).is_empty());
    }

    #[test]
    fn test_unrelated_people_isolated() {
        let appointments = vec![
            appt("a1", (9, 0), (10, 0)),
            appt("a2", (9, 30), (10, 30)),
            appt("b1", (9, 0), (10, 0)),
            appt("b2", (9, 30), (10, 30)),
        ];
        let people = vec![
            Person::new("p1", "Ada", ["a1", "a2"]),
            Person::new("p2", "Bob", ["a1", "b1"]),
            Person::new("p3", "Cy", ["b2"]),
        ];

        let groups = detect(&people, &appointments);
        // Bob's a1 and b1 share timestamps, so Bob conflicts on his own links
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].person, "Ada");
        assert_eq!(ids(&groups[0]), vec!["a1", "a2"]);
        assert_eq!(groups[1].person, "Bob");
        assert_eq!(ids(&groups[1]), vec!["a1", "b1"]);
    }

    #[test]
    fn test_groups_follow_people_order() {
        let appointments = vec![appt("a1", (9, 0), (10, 0)), appt("a2", (9, 30), (10, 30))];
        let people = vec![
            Person::new("p3", "Zed", ["a1", "a2"]),
            Person::new("p2", "Nobody", Vec::<String>::new()),
            Person::new("p1", "Ada", ["a2", "a1"]),
        ];

        let names: Vec<String> = detect(&people, &appointments)
            .into_iter()
            .map(|g| g.person)
            .collect();
        assert_eq!(names, vec!["Zed", "Ada"]);
    }

    #[test]
    fn test_unresolved_link_is_dropped() {
        let appointments = vec![appt("a1", (9, 0), (10, 0)), appt("a2", (11, 0), (12, 0))];
        let people = vec![Person::new("p1", "Ada", ["a1", "missing", "a2"])];
        assert!(detect(&people, &appointments).is_empty());
    }

    #[test]
    fn test_appointments_outside_batch_are_ignored() {
        // a2 overlaps a1 but is not part of the batch
        let batch = vec![appt("a1", (9, 0), (10, 0))];
        let people = vec![Person::new("p1", "Ada", ["a1", "a2"])];
        assert!(detect(&people, &batch).is_empty());
    }

    #[test]
    fn test_duplicate_batch_ids_first_wins() {
        let appointments = vec![
            appt("a1", (9, 0), (10, 0)),
            appt("a2", (13, 0), (14, 0)),
            appt("a2", (9, 30), (10, 30)),
        ];
        let people = vec![Person::new("p1", "Ada", ["a1", "a2"])];
        assert!(detect(&people, &appointments).is_empty());
    }

    #[test]
    fn test_empty_display_name_is_kept() {
        let appointments = vec![appt("a1", (9, 0), (10, 0)), appt("a2", (9, 30), (10, 30))];
        let people = vec![Person::new("p1", "", ["a1", "a2"])];
        let groups = detect(&people, &appointments);
        assert_eq!(groups[0].person, "");
    }

    #[test]
    fn test_detection_is_idempotent() {
        let appointments = vec![
            appt("a1", (9, 0), (10, 0)),
            appt("a2", (9, 30), (10, 30)),
            appt("a3", (10, 15), (11, 0)),
        ];
        let people = vec![Person::new("p1", "Ada", ["a1", "a2", "a3"])];

        let first = detect(&people, &appointments);
        let second = detect(&people, &appointments);
        assert_eq!(first.len(), second.len());
        assert_eq!(ids(&first[0]), ids(&second[0]));
    }

    #[test]
    fn test_conflicting_pairs_evaluated_once() {
        let appointments = vec![
            appt("a1", (9, 0), (10, 0)),
            appt("a2", (9, 30), (10, 30)),
            appt("a3", (10, 15), (11, 0)),
        ];
        let person = Person::new("p1", "Ada", ["a1", "a2", "a3"]);
        let index = index_batch(&appointments);

        let pairs: Vec<(&str, &str)> = conflicting_pairs(&person, &index)
            .into_iter()
            .map(|(a, b)| (a.id.as_str(), b.id.as_str()))
            .collect();
        // a1/a3 do not overlap; every other pair appears once
        assert_eq!(pairs, vec![("a1", "a2"), ("a2", "a3")]);
    }

    #[test]
    fn test_symmetry_both_members_reported() {
        let appointments = vec![appt("a1", (9, 30), (10, 30)), appt("a2", (9, 0), (10, 0))];
        let person = Person::new("p1", "Ada", ["a1", "a2"]);
        let index = index_batch(&appointments);

        let group = detect_for_person(&person, &index).unwrap();
        assert!(group.contains("a1") && group.contains("a2"));
    }

    #[test]
    fn test_ill_ordered_interval_passes_through_predicate() {
        // start > end is not rejected; [11,9] vs [9:30,10:30] matches the containment clause
        let appointments = vec![appt("bad", (11, 0), (9, 0)), appt("ok", (9, 30), (10, 30))];
        let people = vec![Person::new("p1", "Ada", ["bad", "ok"])];
        let groups = detect(&people, &appointments);
        assert_eq!(ids(&groups[0]), vec!["bad", "ok"]);
    }

    #[test]
    fn test_generic_timestamps_with_nan() {
        let appointments = vec![
            Appointment::new("a1", 1.0, 5.0),
            Appointment::new("a2", f64::NAN, f64::NAN),
        ];
        let people = vec![Person::new("p1", "Ada", ["a1", "a2"])];
        assert!(detect(&people, &appointments).is_empty());
    }
}
