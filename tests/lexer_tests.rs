// tests/lexer_tests.rs

use udq_lang::ast::Token;
use udq_lang::lexer::Lexer;

fn tokens(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut result = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        if token == Token::Eof {
            return result;
        }
        result.push(token);
    }
}

// ============================================================================
// Single Character Tokens
// ============================================================================

#[test]
fn test_single_char_tokens() {
    let test_cases = vec![
        ("+", Token::Plus),
        ("-", Token::Minus),
        ("*", Token::Star),
        ("/", Token::Slash),
        ("^", Token::Caret),
        ("(", Token::LParen),
        (")", Token::RParen),
        ("[", Token::LBracket),
        ("]", Token::RBracket),
        ("<", Token::Lt),
        (">", Token::Gt),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token, expected, "Failed for input: {}", input);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }
}

// ============================================================================
// Two Character Tokens
// ============================================================================

#[test]
fn test_comparison_tokens() {
    assert_eq!(
        tokens("== != <= >="),
        vec![Token::EqEq, Token::NotEq, Token::LtEq, Token::GtEq]
    );
}

#[test]
fn test_single_equals_is_an_error() {
    let mut lexer = Lexer::new("A = B");
    lexer.next_token().unwrap();
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.position.offset, 2);
    assert!(err.to_string().contains("'=='"));
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn test_numbers() {
    assert_eq!(
        tokens("3 0.90 400. .5 1e3 2.5E-2 1D2"),
        vec![
            Token::Number(3.0),
            Token::Number(0.9),
            Token::Number(400.0),
            Token::Number(0.5),
            Token::Number(1000.0),
            Token::Number(0.025),
            Token::Number(100.0),
        ]
    );
}

#[test]
fn test_exponent_needs_digits() {
    // `2E` is a number followed by a keyword
    assert_eq!(
        tokens("2E"),
        vec![Token::Number(2.0), Token::Identifier("E".to_string())]
    );
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn test_keywords_and_selectors() {
    assert_eq!(
        tokens("WOPR 'PROD*' RGPR_RE2 1"),
        vec![
            Token::Identifier("WOPR".to_string()),
            Token::Quoted("PROD*".to_string()),
            Token::Identifier("RGPR_RE2".to_string()),
            Token::Number(1.0),
        ]
    );
}

#[test]
fn test_table_lookup_tokens() {
    assert_eq!(
        tokens("TU_FBHP[FOPR]"),
        vec![
            Token::Identifier("TU_FBHP".to_string()),
            Token::LBracket,
            Token::Identifier("FOPR".to_string()),
            Token::RBracket,
        ]
    );
}

#[test]
fn test_unterminated_quote() {
    let mut lexer = Lexer::new("WOPR 'PROD1");
    lexer.next_token().unwrap();
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.position.offset, 5);
}

#[test]
fn test_unexpected_character() {
    let mut lexer = Lexer::new("FOPR % 2");
    lexer.next_token().unwrap();
    assert!(lexer.next_token().is_err());
}

#[test]
fn test_token_start_skips_whitespace() {
    let mut lexer = Lexer::new("   FOPR");
    assert_eq!(lexer.token_start().offset, 3);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("FOPR".to_string()));
}
