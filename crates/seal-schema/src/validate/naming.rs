use crate::{MAX_APP_LABEL_LEN, MAX_ENTITY_NAME_LEN, MAX_FIELD_NAME_LEN};

/// Words that cannot be used as attribute names.
pub const RESERVED_WORDS: &[&str] = &["pk", "self"];

/// Attribute names double as query lookups, so `__` and a trailing `_` are out.
pub fn validate_ident(ident: &str) -> Result<(), String> {
    if ident.is_empty() {
        return Err("attribute name is empty".to_string());
    }
    if ident.len() > MAX_FIELD_NAME_LEN {
        return Err(format!(
            "attribute '{ident}' is longer than {MAX_FIELD_NAME_LEN}"
        ));
    }
    validate_word(ident)?;
    if ident.ends_with('_') {
        return Err(format!("attribute '{ident}' cannot end with '_'"));
    }
    if ident.contains("__") {
        return Err(format!("attribute '{ident}' cannot contain '__'"));
    }

    check_reserved(ident)
}

pub fn validate_entity_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("type name is empty".to_string());
    }
    if name.len() > MAX_ENTITY_NAME_LEN {
        return Err(format!(
            "type name '{name}' is longer than {MAX_ENTITY_NAME_LEN}"
        ));
    }
    if !name.is_ascii() {
        return Err(format!("type name '{name}' is not ASCII"));
    }

    validate_word(name)
}

pub fn validate_app_label(label: &str) -> Result<(), String> {
    if label.is_empty() {
        return Err("app label is empty".to_string());
    }
    if label.len() > MAX_APP_LABEL_LEN {
        return Err(format!(
            "app label '{label}' is longer than {MAX_APP_LABEL_LEN}"
        ));
    }

    validate_word(label)
}

fn validate_word(word: &str) -> Result<(), String> {
    let mut chars = word.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("'{word}' is not a valid identifier"));
    }

    Ok(())
}

fn check_reserved(word: &str) -> Result<(), String> {
    if RESERVED_WORDS.contains(&word) {
        return Err(format!("'{word}' is a reserved attribute name"));
    }

    Ok(())
}
