// src/common/db_utils.rs

use crate::common::error::AppError;

// ---
// Helpers de busca textual
// ---

/// Monta o padrão `%termo%` para `ILIKE`, escapando os curingas do próprio termo.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Equivalente em memória do `ILIKE '%termo%'`.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ---
// Tradução de erros do Postgres
// ---
pub fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            if let Some(constraint) = db_err.constraint() {
                return match constraint {
                    "users_email_key" => AppError::EmailAlreadyExists,
                    other => AppError::Conflict(format!("Violação de unicidade: {}", other)),
                };
            }
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn contains_ci_ignores_case() {
        assert!(contains_ci("Escola Central", "central"));
        assert!(!contains_ci("Escola Central", "norte"));
    }
}
