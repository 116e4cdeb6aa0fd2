//! Declarative registry of entity types.
//!
//! Each [`EntitySpec`] describes one category of per-user facts: the
//! query that fetches it from the profile database, the columns that
//! query returns, which foreign keys are resolved against the reference
//! database, and which integer columns are decoded through a
//! [`CodeKind`]. Adding an entity type means adding an entry to
//! [`REGISTRY`]; nothing downstream changes.
//!
//! Every query takes exactly one bound parameter, `$1`, holding the
//! batch of user identifiers, and filters out soft-deleted rows.

use crate::codes::CodeKind;
use crate::error::{PipelineError, PipelineResult};
use crate::models::USER_ID_COLUMN;

/// A foreign-key column resolved through a reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupSpec {
    /// Raw foreign-key column in the entity row.
    pub column: &'static str,
    /// Reference table in the secondary database.
    pub table: &'static str,
    /// Column of `table` matched against the foreign key.
    pub key_column: &'static str,
    /// Column of `table` holding the human-readable label.
    pub label_column: &'static str,
    /// Field name the resolved label is stored under.
    pub target: &'static str,
}

impl LookupSpec {
    /// Lookup keyed by `uuid`, labelled by `name`, with the label stored
    /// under the column name minus its `_id` suffix.
    pub const fn named(column: &'static str, table: &'static str, target: &'static str) -> Self {
        Self {
            column,
            table,
            key_column: "uuid",
            label_column: "name",
            target,
        }
    }
}

/// An integer column translated through a fixed code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeColumn {
    pub column: &'static str,
    pub kind: CodeKind,
}

const fn code(column: &'static str, kind: CodeKind) -> CodeColumn {
    CodeColumn { column, kind }
}

/// Static definition of one entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntitySpec {
    /// Key of this entity in the composite document.
    pub name: &'static str,
    /// Query template; `$1` is the batch of user identifiers.
    pub query: &'static str,
    /// Output columns, positionally matching the query's select list.
    pub columns: &'static [&'static str],
    pub lookups: &'static [LookupSpec],
    pub codes: &'static [CodeColumn],
}

impl EntitySpec {
    /// Position of a column in the row, if declared.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// Position of a column, or a [`PipelineError::MissingColumn`].
    pub fn require_column(&self, column: &str) -> PipelineResult<usize> {
        self.column_index(column)
            .ok_or_else(|| PipelineError::MissingColumn {
                entity: self.name,
                column: column.to_string(),
            })
    }

    /// Field names of the records this entity produces, group key included.
    pub fn output_fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = self
            .columns
            .iter()
            .copied()
            .filter(|c| !self.lookups.iter().any(|l| l.column == *c))
            .collect();
        fields.extend(self.lookups.iter().map(|l| l.target));
        fields
    }

    /// Check this definition's internal consistency.
    ///
    /// Every lookup and code column must be declared, the group key must
    /// be present, lookup identifiers must be plain SQL identifiers, and
    /// no resolved label may collide with a surviving column.
    pub fn validate(&self) -> PipelineResult<()> {
        self.require_column(USER_ID_COLUMN)?;
        for lookup in self.lookups {
            self.require_column(lookup.column)?;
            validate_identifier(lookup.table)?;
            validate_identifier(lookup.key_column)?;
            validate_identifier(lookup.label_column)?;
        }
        for code in self.codes {
            self.require_column(code.column)?;
        }
        let fields = self.output_fields();
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].contains(field) {
                return Err(PipelineError::InvalidIdentifier(format!(
                    "{}.{} (duplicate output field)",
                    self.name, field
                )));
            }
        }
        Ok(())
    }
}

/// Accept only `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes.
///
/// Reference table and column names are interpolated into SQL text, so
/// anything else is refused before a query is built.
pub fn validate_identifier(name: &str) -> PipelineResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid_start && valid_rest && name.len() <= 63 {
        Ok(())
    } else {
        Err(PipelineError::InvalidIdentifier(name.to_string()))
    }
}

/// Look up a registered entity by name.
pub fn find(name: &str) -> Option<&'static EntitySpec> {
    REGISTRY.iter().find(|e| e.name == name)
}

const COUNTRY: LookupSpec = LookupSpec::named("country_id", "countries", "country");
const STATE: LookupSpec = LookupSpec::named("state_id", "states", "state");
const SUBJECT: LookupSpec = LookupSpec::named("subject_id", "subjects", "subject");

/// Every entity type, in composite-document key order.
pub static REGISTRY: &[EntitySpec] = &[
    EntitySpec {
        name: "preferred_work_locations",
        query: r#"
            select
                learning_user_id,
                country_id,
                state_id,
                "sequence"
            from
                preferred_work_locations
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &["user_id", "country_id", "state_id", "sequence"],
        lookups: &[COUNTRY, STATE],
        codes: &[],
    },
    EntitySpec {
        name: "user_awards",
        query: r#"
            select
                learning_user_id,
                title,
                issuer,
                to_char(issued_on, 'YYYY-MM-DD') as issued_on,
                description,
                certificate,
                certificate_name
            from
                user_awards
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &[
            "user_id",
            "title",
            "issuer",
            "issued_on",
            "description",
            "certificate",
            "certificate_name",
        ],
        lookups: &[],
        codes: &[],
    },
    EntitySpec {
        name: "user_certifications",
        query: r#"
            select
                learning_user_id,
                name,
                organisation_name,
                will_expire,
                to_char(completion_date, 'YYYY-MM-DD') as completion_date,
                to_char(expiration_date, 'YYYY-MM-DD') as expiration_date,
                mode_of_learning,
                suraasa_certification_id::text,
                status,
                uce.user_certification_id is not null as have_evidences
            from
                user_certifications uc
            left join (
                select distinct user_certification_id
                from user_certification_evidences
                where deleted_at is null
            ) uce on uc.id = uce.user_certification_id
            where
                uc.deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &[
            "user_id",
            "name",
            "organisation_name",
            "will_expire",
            "completion_date",
            "expiration_date",
            "mode_of_learning",
            "suraasa_certification_id",
            "status",
            "have_evidences",
        ],
        lookups: &[],
        codes: &[
            code("mode_of_learning", CodeKind::ModeOfLearning),
            code("status", CodeKind::CompletionStatus),
        ],
    },
    EntitySpec {
        name: "user_computed_fields",
        query: r#"
            select
                days_of_experience,
                learning_user_id
            from
                user_computed_fields
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &["days_of_experience", "user_id"],
        lookups: &[],
        codes: &[],
    },
    EntitySpec {
        name: "user_interests",
        query: r#"
            select
                learning_user_id,
                interest
            from
                user_interests
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &["user_id", "interest"],
        lookups: &[],
        codes: &[],
    },
    EntitySpec {
        name: "user_languages",
        query: r#"
            select
                learning_user_id,
                language_id,
                proficiency
            from
                user_languages
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &["user_id", "language_id", "proficiency"],
        lookups: &[LookupSpec::named("language_id", "languages", "language")],
        codes: &[code("proficiency", CodeKind::Proficiency)],
    },
    EntitySpec {
        name: "user_profiles",
        query: r#"
            select
                learning_user_id,
                to_char(date_of_birth, 'YYYY-MM-DD') as date_of_birth,
                gender,
                nationality_id::text,
                country_id,
                state_id,
                is_verified,
                looking_for_jobs,
                career_aspiration
            from
                user_profiles
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &[
            "user_id",
            "date_of_birth",
            "gender",
            "nationality_id",
            "country_id",
            "state_id",
            "is_verified",
            "looking_for_jobs",
            "career_aspiration",
        ],
        lookups: &[COUNTRY, STATE],
        codes: &[code("gender", CodeKind::Gender)],
    },
    EntitySpec {
        name: "user_projects",
        query: r#"
            select
                learning_user_id,
                title,
                currently_working,
                to_char(start_date, 'YYYY-MM-DD') as start_date,
                to_char(end_date, 'YYYY-MM-DD') as end_date,
                url,
                description
            from
                user_projects
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &[
            "user_id",
            "title",
            "currently_working",
            "start_date",
            "end_date",
            "url",
            "description",
        ],
        lookups: &[],
        codes: &[],
    },
    EntitySpec {
        name: "user_publications",
        query: r#"
            select
                learning_user_id,
                title,
                publisher,
                to_char(published_on, 'YYYY-MM-DD') as published_on,
                url,
                description
            from
                user_publications
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &[
            "user_id",
            "title",
            "publisher",
            "published_on",
            "url",
            "description",
        ],
        lookups: &[],
        codes: &[],
    },
    EntitySpec {
        name: "user_qualifications",
        query: r#"
            select
                learning_user_id,
                organisation_name,
                name,
                qualification_field_id,
                to_char(start_date, 'YYYY-MM-DD') as start_date,
                to_char(end_date, 'YYYY-MM-DD') as end_date,
                grade,
                mode_of_learning,
                suraasa_qualification_id::text,
                status,
                qualification_level_id,
                uqe.user_qualification_id is not null as have_evidences
            from
                user_qualifications uq
            left join (
                select distinct user_qualification_id
                from user_qualification_evidences
                where deleted_at is null
            ) uqe on uq.id = uqe.user_qualification_id
            where
                uq.deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &[
            "user_id",
            "organisation_name",
            "name",
            "qualification_field_id",
            "start_date",
            "end_date",
            "grade",
            "mode_of_learning",
            "suraasa_qualification_id",
            "status",
            "qualification_level_id",
            "have_evidences",
        ],
        lookups: &[
            LookupSpec::named(
                "qualification_field_id",
                "qualification_fields",
                "qualification_field",
            ),
            LookupSpec::named(
                "qualification_level_id",
                "qualification_levels",
                "qualification_level",
            ),
        ],
        codes: &[
            code("mode_of_learning", CodeKind::ModeOfLearning),
            code("status", CodeKind::CompletionStatus),
        ],
    },
    EntitySpec {
        name: "user_skills",
        query: r#"
            select
                learning_account_id,
                skill_name,
                "sequence"
            from
                user_skills
            where
                deleted_at is null
                and learning_account_id = any($1)
        "#,
        columns: &["user_id", "skill_name", "sequence"],
        lookups: &[],
        codes: &[],
    },
    EntitySpec {
        name: "user_subject_experiences",
        query: r#"
            select
                learning_user_id,
                subject_id,
                days_of_experience
            from
                user_subject_experiences
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &["user_id", "subject_id", "days_of_experience"],
        lookups: &[SUBJECT],
        codes: &[],
    },
    EntitySpec {
        name: "user_subject_interests",
        query: r#"
            select
                learning_user_id,
                subject_id,
                "sequence"
            from
                user_subject_interests
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &["user_id", "subject_id", "sequence"],
        lookups: &[SUBJECT],
        codes: &[],
    },
    EntitySpec {
        name: "user_test_scores",
        query: r#"
            select
                learning_user_id,
                name,
                score::text,
                to_char(test_date, 'YYYY-MM-DD') as test_date,
                description,
                (evidence_document is not null or evidence_url is not null) as has_evidence
            from
                user_test_scores
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &[
            "user_id",
            "name",
            "score",
            "test_date",
            "description",
            "has_evidence",
        ],
        lookups: &[],
        codes: &[],
    },
    EntitySpec {
        name: "user_work_experiences",
        query: r#"
            select
                learning_user_id,
                title,
                employment_type,
                description,
                organisation_name,
                organisation_type,
                other_organisation_type,
                country_id,
                state_id,
                currently_working,
                to_char(start_date, 'YYYY-MM-DD') as start_date,
                to_char(end_date, 'YYYY-MM-DD') as end_date,
                salary::float8,
                currency_id,
                curriculum_id,
                teaching_level_id,
                teaching_role_id,
                (
                    select json_agg(wes.subject_id)
                    from work_experience_subjects wes
                    where wes.work_experience_id = uwe.id
                ) as subjects
            from
                user_work_experiences uwe
            where
                deleted_at is null
                and learning_user_id = any($1)
        "#,
        columns: &[
            "user_id",
            "title",
            "employment_type",
            "description",
            "organisation_name",
            "organisation_type",
            "other_organisation_type",
            "country_id",
            "state_id",
            "currently_working",
            "start_date",
            "end_date",
            "salary",
            "currency_id",
            "curriculum_id",
            "teaching_level_id",
            "teaching_role_id",
            "subjects",
        ],
        lookups: &[
            COUNTRY,
            STATE,
            LookupSpec::named("currency_id", "currencies", "currency"),
            LookupSpec::named("curriculum_id", "curriculum", "curriculum"),
            LookupSpec::named("teaching_level_id", "teaching_levels", "teaching_level"),
            LookupSpec::named("teaching_role_id", "teaching_roles", "teaching_role"),
        ],
        codes: &[
            code("employment_type", CodeKind::EmploymentType),
            code("organisation_type", CodeKind::OrganisationType),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_entries_are_valid() {
        for spec in REGISTRY {
            spec.validate()
                .unwrap_or_else(|e| panic!("{} is invalid: {}", spec.name, e));
        }
    }

    #[test]
    fn test_registry_names_unique() {
        for (i, spec) in REGISTRY.iter().enumerate() {
            assert!(
                REGISTRY[..i].iter().all(|other| other.name != spec.name),
                "duplicate entity {}",
                spec.name
            );
        }
        assert_eq!(REGISTRY.len(), 15);
    }

    #[test]
    fn test_queries_take_one_batch_parameter() {
        for spec in REGISTRY {
            assert!(spec.query.contains("= any($1)"), "{}", spec.name);
            assert!(!spec.query.contains("$2"), "{}", spec.name);
            assert!(spec.query.contains("deleted_at is null"), "{}", spec.name);
        }
    }

    #[test]
    fn test_output_fields_append_labels() {
        let spec = find("user_languages").unwrap();
        assert_eq!(
            spec.output_fields(),
            vec!["user_id", "proficiency", "language"]
        );
    }

    #[test]
    fn test_colliding_label_rejected() {
        let spec = EntitySpec {
            name: "clash",
            query: "",
            columns: &["user_id", "country", "country_id"],
            lookups: &[COUNTRY],
            codes: &[],
        };
        assert!(matches!(
            spec.validate(),
            Err(PipelineError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("teaching_levels").is_ok());
        assert!(validate_identifier("_t1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("users; drop table x").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }
}
