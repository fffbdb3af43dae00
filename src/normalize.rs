//! Column-name normalization.
//!
//! Two deliberately distinct routines live here:
//!
//! - [`normalize_key`] is the canonical normalizer the unifier applies to a
//!   merged schema: trim, lowercase, internal whitespace runs become a single
//!   underscore.
//! - [`fold`] is the weaker form the comparator uses on both the model and
//!   the file column lists: trim and lowercase only. Internal spaces are kept
//!   so that `"fecha nacimiento"` in a model still lines up with the same
//!   spaced header in a file.
//!
//! Collapsing the two into one routine would silently change the comparator's
//! matching/missing lists for any header with internal spaces.

/// Canonical normalized key for a raw column name. Idempotent.
pub fn normalize_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_gap = false;
    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            if !in_gap {
                out.push('_');
            }
            in_gap = true;
            continue;
        }
        in_gap = false;
        for lowered in ch.to_lowercase() {
            out.push(lowered);
        }
    }
    out
}

/// Trim-and-lowercase fold used by the schema comparator.
pub fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_key_trims_lowers_and_underscores() {
        assert_eq!(normalize_key(" Nombre Completo "), "nombre_completo");
        assert_eq!(normalize_key("EMAIL"), "email");
        assert_eq!(normalize_key("fecha\tde  pago"), "fecha_de_pago");
        assert_eq!(normalize_key("Cédula"), "cédula");
    }

    #[test]
    fn normalize_key_is_idempotent_on_examples() {
        for raw in [" Nombre Completo ", "Teléfono Móvil", "a  b", "__x__"] {
            let once = normalize_key(raw);
            assert_eq!(normalize_key(&once), once);
        }
    }

    #[test]
    fn fold_keeps_internal_spaces() {
        assert_eq!(fold("  Fecha Nacimiento "), "fecha nacimiento");
        assert_ne!(fold("Fecha Nacimiento"), normalize_key("Fecha Nacimiento"));
    }

    proptest! {
        #[test]
        fn normalize_key_is_idempotent(raw in "\\PC{0,40}") {
            let once = normalize_key(&raw);
            prop_assert_eq!(normalize_key(&once), once.clone());
        }

        #[test]
        fn fold_is_idempotent(raw in "\\PC{0,40}") {
            let once = fold(&raw);
            prop_assert_eq!(fold(&once), once.clone());
        }
    }
}
