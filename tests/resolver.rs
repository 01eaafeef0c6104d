#[cfg(test)]
mod resolver_tests {
    use rox_interpreter as lox;

    use lox::ast::{Expr, Stmt};
    use lox::error::LoxError;
    use lox::parser::Parser;
    use lox::resolver::{Locals, Resolver};
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens: Vec<Token> = Scanner::new(source)
            .collect::<Result<Vec<Token>, LoxError>>()
            .expect("source should scan cleanly");

        Parser::new(&tokens)
            .parse()
            .expect("source should parse cleanly")
    }

    fn resolve(source: &str) -> (Vec<Stmt>, Result<Locals, Vec<LoxError>>) {
        let statements = parse(source);
        let result = Resolver::new().resolve(&statements);
        (statements, result)
    }

    fn errors(source: &str) -> Vec<String> {
        resolve(source)
            .1
            .expect_err("source should fail to resolve")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    fn assert_resolves(source: &str) {
        if let Err(errors) = resolve(source).1 {
            panic!("unexpected resolve errors: {:?}", errors);
        }
    }

    #[test]
    fn test_block_local_distance() {
        let (statements, result) = resolve("{ var a = 1; { print a; } }");
        let locals = result.expect("should resolve");

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected inner block");
        };
        let Stmt::Print(Expr::Variable { id, .. }) = &inner[0] else {
            panic!("expected print of a variable");
        };

        assert_eq!(locals.get(id), Some(&1));
    }

    #[test]
    fn test_globals_are_left_unresolved() {
        let (_, result) = resolve("var g = 1; print g; g = 2;");

        assert!(result.expect("should resolve").is_empty());
    }

    #[test]
    fn test_static_member_distance() {
        let (statements, result) =
            resolve("class A { static var x = 1; static f() { return x; } }");
        let locals = result.expect("should resolve");

        let Stmt::Class { members, .. } = &statements[0] else {
            panic!("expected class");
        };
        let Stmt::Function(f) = &members[1] else {
            panic!("expected static method");
        };
        let Stmt::Return {
            value: Some(Expr::Variable { id, .. }),
            ..
        } = &f.body[0]
        else {
            panic!("expected return of a variable");
        };

        // parameter scope, then the class's static scope
        assert_eq!(locals.get(id), Some(&1));
    }

    #[test]
    fn test_static_member_sees_enclosing_locals() {
        let (statements, result) =
            resolve("fun make() { var k = 1; class A { static f() { return k; } } }");
        let locals = result.expect("should resolve");

        let Stmt::Function(make) = &statements[0] else {
            panic!("expected function");
        };
        let Stmt::Class { members, .. } = &make.body[1] else {
            panic!("expected class");
        };
        let Stmt::Function(f) = &members[0] else {
            panic!("expected static method");
        };
        let Stmt::Return {
            value: Some(Expr::Variable { id, .. }),
            ..
        } = &f.body[0]
        else {
            panic!("expected return of a variable");
        };

        // parameters, the class's static scope, then the body of `make`
        assert_eq!(locals.get(id), Some(&2));
    }

    #[test]
    fn test_this_and_super_distances() {
        let (statements, result) =
            resolve("class A {} class B < A { m() { this; super.m; } }");
        let locals = result.expect("should resolve");

        let Stmt::Class { members, .. } = &statements[1] else {
            panic!("expected class");
        };
        let Stmt::Function(m) = &members[0] else {
            panic!("expected method");
        };
        let Stmt::Expression(Expr::This { id: this_id, .. }) = &m.body[0] else {
            panic!("expected this");
        };
        let Stmt::Expression(Expr::Super { id: super_id, .. }) = &m.body[1] else {
            panic!("expected super");
        };

        assert_eq!(locals.get(this_id), Some(&1));
        assert_eq!(locals.get(super_id), Some(&2));
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            errors("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );

        // Globals may be redeclared and read freely.
        assert_resolves("var a = 1; var a = a;");
    }

    #[test]
    fn test_duplicate_declarations() {
        assert_eq!(
            errors("fun f(a, a) {}"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        assert_eq!(
            errors("class A { static var x; static x() {} }"),
            vec!["[line 1] Error at 'x': Already a static member with this name in this class."]
        );
    }

    #[test]
    fn test_this_and_super_outside_classes() {
        assert_eq!(
            errors("print this;\nsuper.m();"),
            vec![
                "[line 1] Error at 'this': Can't use 'this' outside of a class.",
                "[line 2] Error at 'super': Can't use 'super' outside of a class.",
            ]
        );
        assert_eq!(
            errors("class A { m() { super.m(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_eq!(
            errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_return_rules() {
        assert_eq!(
            errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
        assert_eq!(
            errors("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );

        assert_resolves("class A { init() { return; } g { return 1; } }");
    }

    #[test]
    fn test_break_rules() {
        assert_eq!(
            errors("break;"),
            vec!["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );
        assert_eq!(
            errors("while (true) { fun f() { break; } }"),
            vec!["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );

        assert_resolves("while (true) { if (true) { break; } }");
    }

    #[test]
    fn test_function_inside_static_getter() {
        assert_eq!(
            errors("class A { static g { fun inner() {} return 1; } }"),
            vec!["[line 1] Error at 'inner': Can't declare a function inside a static getter-field."]
        );

        assert_resolves("class A { g { fun inner() {} return inner; } }");
    }

    #[test]
    fn test_all_errors_are_reported() {
        let found = errors("return 1;\nbreak;\n{ var b = b; }");

        assert_eq!(found.len(), 3);
        assert!(found[0].starts_with("[line 1]"));
        assert!(found[1].starts_with("[line 2]"));
        assert!(found[2].starts_with("[line 3]"));
    }
}
