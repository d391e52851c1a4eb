use crate::domain::payment::CaptureMethod;
use crate::error::{Result, WorkflowError};
use serde::Deserialize;
use std::io::Read;

/// One scripted payment attempt.
///
/// A missing token means the operator dismissed the capture page.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct PaymentAttempt {
    pub position: usize,
    pub method: CaptureMethod,
    #[serde(default)]
    pub token: Option<String>,
}

/// Reads payment attempts (`position, method, token`) from a CSV source.
pub struct AttemptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AttemptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn attempts(self) -> impl Iterator<Item = Result<PaymentAttempt>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WorkflowError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "position, method, token\n2, manual, tok_abc\n0, card_present, \n1, manual,";
        let results: Vec<Result<PaymentAttempt>> =
            AttemptReader::new(data.as_bytes()).attempts().collect();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &PaymentAttempt {
                position: 2,
                method: CaptureMethod::Manual,
                token: Some("tok_abc".to_string()),
            }
        );
        assert_eq!(results[1].as_ref().unwrap().method, CaptureMethod::CardPresent);
        assert_eq!(results[1].as_ref().unwrap().token, None);
        assert_eq!(results[2].as_ref().unwrap().token, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "position, method, token\n1, swipe, tok\n-1, manual, tok";
        let results: Vec<Result<PaymentAttempt>> =
            AttemptReader::new(data.as_bytes()).attempts().collect();

        assert!(results[0].is_err());
        assert!(results[1].is_err());
    }
}
