//! Outbound payload sanitization.
//!
//! Every record that crosses the local/remote boundary goes through
//! [`sanitize`] or [`sanitize_document`]. Afterwards no
//! [`FieldValue::Missing`] remains at any depth, so encoders for the remote
//! wire format never need per-field special cases.

use crate::models::{Document, FieldValue};

/// Strip unrepresentable values from `value`. Total: never fails.
///
/// - `Missing` or `Null` becomes `Null`
/// - arrays drop `Missing` and `Null` elements instead of keeping holes
/// - maps drop keys whose value is `Missing`; explicit `Null`s stay
/// - scalars are returned unchanged
pub fn sanitize(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Missing | FieldValue::Null => FieldValue::Null,
        FieldValue::Array(values) => FieldValue::Array(
            values
                .into_iter()
                .filter(|value| !value.is_absent())
                .map(sanitize)
                .collect(),
        ),
        FieldValue::Map(entries) => FieldValue::Map(sanitize_document(entries)),
        scalar => scalar,
    }
}

/// Apply the map rule of [`sanitize`] to a whole document.
pub fn sanitize_document(document: Document) -> Document {
    document
        .into_iter()
        .filter(|(_, value)| !value.is_missing())
        .map(|(key, value)| (key, sanitize(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contains_missing(value: &FieldValue) -> bool {
        match value {
            FieldValue::Missing => true,
            FieldValue::Array(values) => values.iter().any(contains_missing),
            FieldValue::Map(entries) => entries.values().any(contains_missing),
            _ => false,
        }
    }

    fn doc(entries: Vec<(&str, FieldValue)>) -> Document {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    #[test]
    fn absent_top_level_becomes_null() {
        assert_eq!(sanitize(FieldValue::Missing), FieldValue::Null);
        assert_eq!(sanitize(FieldValue::Null), FieldValue::Null);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(sanitize(FieldValue::Integer(7)), FieldValue::Integer(7));
        assert_eq!(sanitize(FieldValue::from("x")), FieldValue::from("x"));
        assert_eq!(sanitize(FieldValue::Bool(false)), FieldValue::Bool(false));
    }

    #[test]
    fn arrays_drop_absent_elements_without_holes() {
        let input = FieldValue::Array(vec![
            FieldValue::Integer(1),
            FieldValue::Missing,
            FieldValue::Null,
            FieldValue::Integer(2),
        ]);

        assert_eq!(
            sanitize(input),
            FieldValue::Array(vec![FieldValue::Integer(1), FieldValue::Integer(2)])
        );
    }

    #[test]
    fn maps_drop_missing_keys_but_keep_explicit_nulls() {
        let input = FieldValue::Map(doc(vec![
            ("kept", FieldValue::from("v")),
            ("gone", FieldValue::Missing),
            ("cleared", FieldValue::Null),
        ]));

        assert_eq!(
            sanitize(input),
            FieldValue::Map(doc(vec![
                ("kept", FieldValue::from("v")),
                ("cleared", FieldValue::Null),
            ]))
        );
    }

    #[test]
    fn nested_missing_values_are_removed_at_every_depth() {
        let input = FieldValue::Map(doc(vec![
            (
                "outer",
                FieldValue::Array(vec![
                    FieldValue::Map(doc(vec![
                        ("a", FieldValue::Missing),
                        (
                            "b",
                            FieldValue::Array(vec![FieldValue::Missing, FieldValue::Integer(3)]),
                        ),
                    ])),
                    FieldValue::Missing,
                ]),
            ),
            ("note", FieldValue::Missing),
        ]));

        let output = sanitize(input);
        assert!(!contains_missing(&output));
        assert_eq!(
            output,
            FieldValue::Map(doc(vec![(
                "outer",
                FieldValue::Array(vec![FieldValue::Map(doc(vec![(
                    "b",
                    FieldValue::Array(vec![FieldValue::Integer(3)])
                )]))]),
            )]))
        );
    }

    #[test]
    fn sanitize_document_applies_map_rule() {
        let document = doc(vec![
            ("title", FieldValue::from("t")),
            ("category", FieldValue::Missing),
        ]);

        assert_eq!(
            sanitize_document(document),
            doc(vec![("title", FieldValue::from("t"))])
        );
    }
}
