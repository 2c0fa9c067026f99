//! Test-case expander: lexicographic cross product of operand domains.

use crate::instructions::Domain;
use crate::logging::{log, LogCategory, LogLevel};
use crate::model::OperandKey;

/// One concrete operand assignment, in domain-declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCase {
    pub values: Vec<(OperandKey, u8)>,
}

impl TestCase {
    /// Value assigned to `key`, if the case has one.
    pub fn value(&self, key: OperandKey) -> Option<u8> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

/// Number of cases [`expand`] yields for `domains`.
pub fn case_count(domains: &[Domain]) -> usize {
    domains.iter().map(|(_, values)| values.len()).product()
}

/// Expand `domains` into every assignment.
///
/// The first domain varies slowest. No domains gives exactly one empty case;
/// an empty value list gives none. Repeated values are kept.
pub fn expand(domains: &[Domain]) -> Vec<TestCase> {
    let mut cases = vec![TestCase::default()];
    for (key, values) in domains {
        let mut next = Vec::with_capacity(cases.len() * values.len());
        for case in &cases {
            for &v in values.iter() {
                let mut values = case.values.clone();
                values.push((*key, v));
                next.push(TestCase { values });
            }
        }
        cases = next;
    }

    log(LogCategory::Expander, LogLevel::Trace, || {
        format!("{} domains expanded to {} cases", domains.len(), cases.len())
    });
    cases
}
