// src/filter/sort.rs

use std::cmp::Ordering;

use sqlx::{Postgres, QueryBuilder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some(dir) if dir.trim().eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Campos ordenáveis de uma entidade: allow-list do nome lógico para a coluna física.
///
/// Nada vindo do cliente é interpolado no SQL; um `sortBy` desconhecido cai no padrão.
pub trait SortField: Copy + Default + Send + Sync {
    type Record;

    // Coluna de desempate (sempre ASC)
    const ID_COLUMN: &'static str;

    fn from_param(name: &str) -> Self;
    fn column(&self) -> &'static str;
    fn compare(&self, a: &Self::Record, b: &Self::Record) -> Ordering;
    fn id_of(record: &Self::Record) -> i64;

    fn parse(raw: Option<&str>) -> Self {
        raw.map(|name| Self::from_param(name.trim()))
            .unwrap_or_default()
    }
}

pub fn push_order_by<S: SortField>(qb: &mut QueryBuilder<'_, Postgres>, field: S, order: SortOrder) {
    qb.push(" ORDER BY ")
        .push(field.column())
        .push(" ")
        .push(order.to_sql());
    if field.column() != S::ID_COLUMN {
        qb.push(", ").push(S::ID_COLUMN).push(" ASC");
    }
}

pub fn sort_records<S: SortField>(rows: &mut [S::Record], field: S, order: SortOrder) {
    rows.sort_by(|a, b| {
        order
            .apply(field.compare(a, b))
            .then_with(|| S::id_of(a).cmp(&S::id_of(b)))
    });
}

/// Igual ao Postgres: NULL vem por último em ASC (e primeiro em DESC).
pub fn cmp_nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    enum NumSort {
        #[default]
        Id,
        Value,
    }

    impl SortField for NumSort {
        type Record = (i64, Option<i32>);
        const ID_COLUMN: &'static str = "t.id";

        fn from_param(name: &str) -> Self {
            match name {
                "value" => NumSort::Value,
                _ => NumSort::Id,
            }
        }

        fn column(&self) -> &'static str {
            match self {
                NumSort::Id => "t.id",
                NumSort::Value => "t.value",
            }
        }

        fn compare(&self, a: &Self::Record, b: &Self::Record) -> Ordering {
            match self {
                NumSort::Id => a.0.cmp(&b.0),
                NumSort::Value => cmp_nulls_last(a.1, b.1),
            }
        }

        fn id_of(record: &Self::Record) -> i64 {
            record.0
        }
    }

    #[test]
    fn unknown_sort_field_falls_back_to_id() {
        assert_eq!(NumSort::parse(Some("value; DROP TABLE t")), NumSort::Id);
        assert_eq!(NumSort::parse(None), NumSort::Id);
        assert_eq!(NumSort::parse(Some("value")), NumSort::Value);
    }

    #[test]
    fn order_by_uses_mapped_column_and_id_tiebreak() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM t");
        push_order_by(&mut qb, NumSort::Value, SortOrder::Desc);
        assert_eq!(qb.sql(), "SELECT * FROM t ORDER BY t.value DESC, t.id ASC");
    }

    #[test]
    fn nulls_sort_last_ascending_and_first_descending() {
        let mut rows = vec![(1, None), (2, Some(5)), (3, Some(1)), (4, Some(5))];

        sort_records(&mut rows, NumSort::Value, SortOrder::Asc);
        assert_eq!(rows.iter().map(|r| r.0).collect::<Vec<_>>(), vec![3, 2, 4, 1]);

        sort_records(&mut rows, NumSort::Value, SortOrder::Desc);
        assert_eq!(rows.iter().map(|r| r.0).collect::<Vec<_>>(), vec![1, 2, 4, 3]);
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!(SortOrder::from_param(Some("DESC")), SortOrder::Desc);
        assert_eq!(SortOrder::from_param(Some("sideways")), SortOrder::Asc);
        assert_eq!(SortOrder::from_param(None), SortOrder::Asc);
    }
}
