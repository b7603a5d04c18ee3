use pretty_assertions::assert_eq;

fn run(src: &str) -> Result<String, tal::error::Error> {
    let mut out = Vec::new();
    tal::run(src, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

macro_rules! demo_tests {
    ($($name:ident),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                let src = include_str!(concat!("../demos/", stringify!($name), ".tal"));
                let expected = include_str!(concat!("../demos/", stringify!($name), ".out"));
                assert_eq!(run(src).unwrap(), expected);
            }
        )*
    };
}

demo_tests!(count, primes, fizzbuzz, factorial, greeting);

#[test]
fn listing_is_stable() {
    let src = include_str!("../demos/count.tal");
    let (program, symbols) = tal::parser::parse_program(src).unwrap();
    let listing = program.render(&symbols);
    assert_eq!(listing, program.render(&symbols));
    assert_eq!(
        listing,
        concat!(
            "    0:  int  decl  i\n",
            "    1:  int  var   i\n",
            "    2:  int  cte   1\n",
            "    3:       :=\n",
            "    4:       while\n",
            "    5:  int  var   i\n",
            "    6:  int  cte   5\n",
            "    7:       <=\n",
            "    8:       if    17\n",
            "    9:  int  var   i\n",
            "   10:       print\n",
            "   11:  int  var   i\n",
            "   12:  int  var   i\n",
            "   13:  int  cte   1\n",
            "   14:       +\n",
            "   15:       :=\n",
            "   16:       goto  4\n",
            "   17:       end\n",
        )
    );
}

#[test]
fn output_before_a_fault_is_kept() {
    let src = "integer x;\nx := 10;\nwhile 1 == 1\n  print 100 / x;\n  x := x - 5;\nend;\n";
    let mut out = Vec::new();
    let error = tal::run(src, &mut out).unwrap_err();
    assert_eq!(String::from_utf8(out).unwrap(), "10\n20\n");
    assert_eq!(error.to_string(), "4:13: division by zero");
    assert_eq!(error.pos(), tal::token::Pos::new(4, 13));
    assert!(matches!(error, tal::error::Error::Runtime(_)));
}

#[test]
fn errors_carry_positions() {
    let cases = [
        ("integer x;\ninteger x;", "2:9: variable x is already declared"),
        ("print y;", "1:7: variable y is not declared"),
        ("print 1 @ 2;", "1:9: unexpected character"),
        ("print 12ab;", "1:7: malformed number"),
        ("if 1 < 2 print 1;", "1:18: expected `end`, found end of file"),
    ];
    for (src, expected) in cases {
        let error = run(src).unwrap_err();
        assert_eq!(error.to_string(), expected, "for {src:?}");
    }
}
