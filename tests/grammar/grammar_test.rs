#[cfg(test)]
mod tests {
    use eds::grammar::{Grammar, GrammarError, ParseNode};

    fn key_values() -> Grammar {
        Grammar::builder()
            .rule("pairs", "pair ; pairs | pair ; | pair")
            .rule("pair", "key = value")
            .rule("key", "[a-z_]+")
            .rule("value", r#"[0-9]+ | '[^']*'"#)
            .build()
            .unwrap()
    }

    #[test]
    fn test_extracts_nested_rules() {
        let grammar = key_values();
        let tree = grammar
            .parse("mass = 300; name = 'caffeine' ;", "pairs")
            .unwrap()
            .unwrap();

        let keys: Vec<&str> = tree
            .extract("key")
            .into_iter()
            .flat_map(ParseNode::leaf_texts)
            .collect();
        assert_eq!(keys, vec!["mass", "name"]);

        let values: Vec<&str> = tree
            .extract("value")
            .into_iter()
            .flat_map(ParseNode::leaf_texts)
            .collect();
        assert_eq!(values, vec!["300", "'caffeine'"]);
    }

    #[test]
    fn test_leaves_exclude_leading_whitespace() {
        let grammar = key_values();
        let tree = grammar.parse("   a   =   1", "pair").unwrap().unwrap();
        assert_eq!(tree.child("key").unwrap().leaf_texts(), vec!["a"]);
        assert_eq!(tree.leaf_texts(), vec!["="]);
    }

    #[test]
    fn test_first_alternative_wins() {
        let grammar = Grammar::builder()
            .rule("word", "[a-z]+ | [a-z]")
            .build()
            .unwrap();
        let tree = grammar.parse("abc", "word").unwrap().unwrap();
        assert_eq!(tree.leaf_texts(), vec!["abc"]);
    }

    #[test]
    fn test_whole_input_must_match() {
        let grammar = key_values();
        assert!(grammar.parse("a = 1; b", "pairs").unwrap().is_none());
        assert!(grammar.parse("a = x", "pairs").unwrap().is_none());
    }

    #[test]
    fn test_visualize() {
        let grammar = Grammar::builder()
            .whitespace("")
            .rule("pair", "key [0-9]")
            .rule("key", "[a-z]")
            .build()
            .unwrap();
        let tree = grammar.parse("a1", "pair").unwrap().unwrap();

        insta::assert_snapshot!(tree.visualize("  "), @r"
        ['pair',
          ['key',
            'a',
          ],
          '1',
        ],
        ");
    }

    #[test]
    fn test_memoization_on_deep_backtracking() {
        // every alternative shares a long prefix that has to be re-parsed
        // when the tail fails
        let build = |memoize| {
            Grammar::builder()
                .rule("s", r"items ! | items \? | items")
                .rule("items", "item items | item")
                .rule("item", "[a-z]")
                .memoize(memoize)
                .build()
                .unwrap()
        };
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(4);

        let memoized = build(true).parse(&text, "s").unwrap();
        let plain = build(false).parse(&text, "s").unwrap();
        assert!(memoized.is_some());
        assert_eq!(memoized, plain);
    }

    #[test]
    fn test_rule_errors() {
        assert!(matches!(
            Grammar::builder().rule("a", "(").build(),
            Err(GrammarError::InvalidPattern { .. })
        ));
        let grammar = key_values();
        assert!(grammar.has_rule("pair"));
        assert!(!grammar.has_rule("missing"));
        assert!(matches!(
            grammar.parse("a = 1", "missing"),
            Err(GrammarError::UnknownRule(_))
        ));
    }
}
