use crate::{parser, vm::Vm};

/// What a source string turned into after going through the whole pipeline.
pub struct Outcome {
    /// Absent if building failed.
    pub listing: Option<String>,
    pub output: String,
    pub error: Option<String>,
}

pub enum Assertion {
    Listing(&'static str),
    Output(&'static str),
    Error(&'static str),
}

pub fn run_pipeline(src: &str) -> Outcome {
    let (program, mut symbols) = match parser::parse_program(src) {
        Ok(built) => built,
        Err(error) => {
            return Outcome {
                listing: None,
                output: String::new(),
                error: Some(error.to_string()),
            }
        }
    };
    let listing = program.render(&symbols);

    let mut out = Vec::with_capacity(64);
    let result = Vm::new(&program, &mut symbols, &mut out).run();
    Outcome {
        listing: Some(listing),
        output: String::from_utf8(out).expect("output is valid UTF-8"),
        error: result.err().map(|error| error.to_string()),
    }
}

/// Trims every line, so that expectations may be indented freely.
fn trim_lines(s: &str) -> String {
    s.trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

#[track_caller]
pub fn run_assertion(assertion: Assertion, outcome: &Outcome) {
    match assertion {
        Assertion::Listing(expected) => {
            let Some(listing) = &outcome.listing else {
                panic!("expected a listing, build failed with {:?}", outcome.error);
            };
            ::pretty_assertions::assert_eq!(trim_lines(listing), trim_lines(expected));
        }
        Assertion::Output(expected) => {
            ::pretty_assertions::assert_eq!(outcome.error.as_deref(), None);
            ::pretty_assertions::assert_eq!(trim_lines(&outcome.output), trim_lines(expected));
        }
        Assertion::Error(expected) => {
            ::pretty_assertions::assert_eq!(outcome.error.as_deref(), Some(expected));
        }
    }
}

macro_rules! code_tests {
    (
        $(
            fn $test_name:ident() {
                let program = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let outcome = crate::util::test_utils::run_pipeline(::indoc::indoc! { $source });
                code_tests!(@@expand_assertions, outcome, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $outcome:expr, []) => {};
    (@@expand_assertions, $outcome:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            code_tests!(@@assertion, $assertion, $assertion_expected),
            &$outcome,
        );
        code_tests!(@@expand_assertions, $outcome, [$($rest_assertions_tt)*]);
    };

    (@@assertion, listing, $expected:expr) => {
        crate::util::test_utils::Assertion::Listing($expected)
    };
    (@@assertion, output, $expected:expr) => {
        crate::util::test_utils::Assertion::Output($expected)
    };
    (@@assertion, error, $expected:expr) => {
        crate::util::test_utils::Assertion::Error($expected)
    };
}
pub(crate) use code_tests;
