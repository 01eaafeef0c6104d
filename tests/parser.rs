#[cfg(test)]
mod parser_tests {
    use rox_interpreter as lox;

    use lox::ast::{Expr, Stmt};
    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn tokens(source: &str) -> Vec<Token> {
        Scanner::new(source)
            .collect::<Result<Vec<Token>, LoxError>>()
            .expect("source should scan cleanly")
    }

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        Parser::new(&tokens(source)).parse()
    }

    fn printed(source: &str) -> Vec<String> {
        parse(source)
            .expect("source should parse cleanly")
            .iter()
            .map(AstPrinter::print_stmt)
            .collect()
    }

    fn errors(source: &str) -> Vec<String> {
        parse(source)
            .expect_err("source should not parse")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            printed("print 1 + 2 * 3 - -4;"),
            vec!["(print (- (+ 1.0 (* 2.0 3.0)) (- 4.0)))"]
        );
        assert_eq!(
            printed("a = b or c and !d;"),
            vec!["(; (= a (or b (and c (! d)))))"]
        );
        assert_eq!(
            printed("(1 + 2) * 3 >= 4 == true;"),
            vec!["(; (== (>= (* (group (+ 1.0 2.0)) 3.0) 4.0) true))"]
        );
    }

    #[test]
    fn test_for_loop_is_desugared() {
        assert_eq!(
            printed("for (var i = 0; i < 2; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 2.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
        assert_eq!(printed("for (;;) break;"), vec!["(while true (break))"]);
    }

    #[test]
    fn test_ternary_is_desugared() {
        assert_eq!(printed("a ? b : c;"), vec!["(if a (; b) (; c))"]);
        assert_eq!(
            printed("a ? b ? c : d : e;"),
            vec!["(if a (if b (; c) (; d)) (; e))"]
        );
    }

    #[test]
    fn test_class_members() {
        let source = "class B < A {\n\
                      static var n = 1;\n\
                      m(x) { return x; }\n\
                      g { return 2; }\n\
                      static s() {}\n\
                      static h { return n; }\n\
                      }";

        assert_eq!(
            printed(source),
            vec![
                "(class B < A (static var n 1.0) (fun m (x) (return x)) \
                 (getter g (return 2.0)) (static fun s ()) (static getter h (return n)))"
            ]
        );
    }

    #[test]
    fn test_properties_this_and_super() {
        assert_eq!(
            printed("this.a.b = super.c(1);"),
            vec!["(; (= (. (. this a) b) (call (super c) 1.0)))"]
        );
    }

    #[test]
    fn test_anonymous_function_argument() {
        assert_eq!(
            printed("f(fun (a) { print a; }, 2);"),
            vec!["(; (call f (fun anonymous (a) (print a)) 2.0))"]
        );
    }

    #[test]
    fn test_errors_are_accumulated() {
        assert_eq!(
            errors("var = 1;\nprint ;\nvar ok = 1;"),
            vec![
                "[line 1] Error at '=': Expected variable name",
                "[line 2] Error at ';': Expected expression",
            ]
        );
    }

    #[test]
    fn test_error_at_end() {
        assert_eq!(
            errors("print 1"),
            vec!["[line 1] Error at end: Expected ';' after value"]
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(
            errors("1 = 2;"),
            vec!["[line 1] Error at '=': Invalid assignment target"]
        );
    }

    #[test]
    fn test_argument_limit() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        assert_eq!(
            errors(&source),
            vec!["[line 1] Error at '255': Cannot have more than 255 arguments"]
        );
    }

    #[test]
    fn test_identical_references_get_distinct_ids() {
        let statements = parse("a; a;").expect("source should parse cleanly");

        let ids: Vec<_> = statements
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expression(Expr::Variable { id, .. }) => *id,
                other => panic!("unexpected statement {:?}", other),
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}
