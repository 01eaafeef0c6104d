#[cfg(test)]
mod interpreter_tests {
    use rox_interpreter as lox;

    use lox::error::{RuntimeErrorKind, SessionError};
    use lox::session::Session;

    fn run(source: &str) -> (String, Result<(), SessionError>) {
        let mut session = Session::new(Vec::new());
        let result = session.run(source);
        let output = String::from_utf8(session.into_output()).expect("output is UTF-8");
        (output, result)
    }

    fn run_ok(source: &str) -> String {
        let (output, result) = run(source);
        if let Err(e) = result {
            panic!("program failed: {:?}\noutput so far:\n{}", e, output);
        }
        output
    }

    /// Output before the failure, plus the runtime error's kind and text.
    fn run_err(source: &str) -> (String, RuntimeErrorKind, String) {
        let (output, result) = run(source);
        match result {
            Err(SessionError::Runtime(e)) => {
                let kind = e.runtime_kind().expect("runtime error has a kind");
                (output, kind, e.to_string())
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    // ── scoping ──────────────────────────────────────────────────────────

    #[test]
    fn test_block_shadowing() {
        let source = "var a = 1;\n{ var a = 2; print a; }\nprint a;";
        assert_eq!(run_ok(source), "2\n1\n");
    }

    #[test]
    fn test_closure_binds_statically() {
        let source = r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
            }
        "#;
        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    #[test]
    fn test_closures_share_captured_scope() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; print i; }
                return count;
            }
            var c = makeCounter();
            c();
            c();
            var d = makeCounter();
            d();
        "#;
        assert_eq!(run_ok(source), "1\n2\n1\n");
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);
        "#;
        assert_eq!(run_ok(source), "610\n");
    }

    // ── control flow ─────────────────────────────────────────────────────

    #[test]
    fn test_break_exits_nearest_loop() {
        let source = r#"
            for (var i = 0; i < 5; i = i + 1) {
                if (i == 2) break;
                print i;
            }
        "#;
        assert_eq!(run_ok(source), "0\n1\n");

        let nested = r#"
            var i = 0;
            while (i < 2) {
                var j = 0;
                while (true) {
                    if (j == 1) { break; }
                    j = j + 1;
                }
                print j;
                i = i + 1;
            }
        "#;
        assert_eq!(run_ok(nested), "1\n1\n");
    }

    #[test]
    fn test_return_unwinds_loops_and_blocks() {
        let source = r#"
            fun first() {
                var i = 0;
                while (true) {
                    { if (i == 3) return i; }
                    i = i + 1;
                }
            }
            print first();
            var after = "scope restored";
            print after;
        "#;
        assert_eq!(run_ok(source), "3\nscope restored\n");
    }

    #[test]
    fn test_logical_operators_return_operands() {
        let source = r#"
            print nil or "x";
            print 1 and 2;
            print false and 1;
            print "" or 3;
        "#;
        assert_eq!(run_ok(source), "x\n2\nfalse\n\n");
    }

    #[test]
    fn test_ternary_statement() {
        let source = "var x; true ? x = 1 : 2; print x; false ? x = 1 : x = 5; print x;";
        assert_eq!(run_ok(source), "1\n5\n");
    }

    // ── auto-print ───────────────────────────────────────────────────────

    #[test]
    fn test_bare_expressions_echo() {
        let source = r#"
            1 + 2;
            "text";
            var a = 1;
            a;
            a = 2;
            if (true) 5;
            if (false) 6; else { 7; }
        "#;
        assert_eq!(run_ok(source), "3\ntext\n");
    }

    #[test]
    fn test_function_body_echoes_even_inside_branch() {
        let source = "fun f() { 7; } if (true) f();";
        assert_eq!(run_ok(source), "7\n");
    }

    // ── values and operators ─────────────────────────────────────────────

    #[test]
    fn test_number_display() {
        assert_eq!(run_ok("print 3.0; print 2.5; print -0.5; print 10 / 4;"), "3\n2.5\n-0.5\n2.5\n");
    }

    #[test]
    fn test_overflow_displays_infinity() {
        let source = r#"
            var n = 10;
            while (n * 10 > n) n = n * 10;
            print n * 10;
            print -(n * 10);
        "#;
        assert_eq!(run_ok(source), "Infinity\n-Infinity\n");
    }

    #[test]
    fn test_string_concatenation() {
        let source = r#"
            print "a" + "b";
            print "a" + 2.7;
            print "a" + -2.7;
        "#;
        assert_eq!(run_ok(source), "ab\na2\na-2\n");

        let (_, kind, _) = run_err(r#"print 1 + "a";"#);
        assert_eq!(kind, RuntimeErrorKind::TypeMismatch);
    }

    #[test]
    fn test_string_ordering() {
        let source = r#"
            print "a" < "b";
            print "ab" < "a";
            print "a" < "ab";
            print "b" >= "b";
        "#;
        assert_eq!(run_ok(source), "true\nfalse\ntrue\ntrue\n");
    }

    #[test]
    fn test_equality_never_coerces() {
        let source = r#"
            print nil == nil;
            print nil == false;
            print 1 == "1";
            print "a" == "a";
            print 0 != false;
        "#;
        assert_eq!(run_ok(source), "true\nfalse\nfalse\ntrue\ntrue\n");
    }

    #[test]
    fn test_truthiness() {
        let source = r#"
            if (0) print "zero"; else print "no";
            if ("") print "empty"; else print "no";
            if (nil) print "nil"; else print "no";
            print !nil;
        "#;
        assert_eq!(run_ok(source), "zero\nempty\nno\ntrue\n");
    }

    #[test]
    fn test_division_by_zero_aborts_run() {
        let (output, kind, message) = run_err("print 1;\nprint 1 / 0;\nprint 2;");

        assert_eq!(output, "1\n");
        assert_eq!(kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!(message, "Division by zero.\n[line 2]");
    }

    #[test]
    fn test_operand_type_errors() {
        let (_, kind, message) = run_err("print -\"a\";");
        assert_eq!(kind, RuntimeErrorKind::TypeMismatch);
        assert_eq!(message, "Operand must be a number.\n[line 1]");

        let (_, kind, _) = run_err("print 1 < \"a\";");
        assert_eq!(kind, RuntimeErrorKind::TypeMismatch);

        let (_, kind, _) = run_err("print nil * 2;");
        assert_eq!(kind, RuntimeErrorKind::TypeMismatch);
    }

    // ── functions ────────────────────────────────────────────────────────

    #[test]
    fn test_anonymous_function_argument() {
        let source = r#"
            fun apply(f, x) { return f(x); }
            var k = 10;
            print apply(fun (n) { return n * 3 + k; }, 2);
        "#;
        assert_eq!(run_ok(source), "16\n");
    }

    #[test]
    fn test_call_errors() {
        let (_, kind, message) = run_err("\"s\"();");
        assert_eq!(kind, RuntimeErrorKind::NotCallable);
        assert_eq!(message, "Can only call functions and classes.\n[line 1]");

        let (_, kind, message) = run_err("fun f(a) {}\nf();");
        assert_eq!(kind, RuntimeErrorKind::ArityMismatch);
        assert_eq!(message, "Expected 1 arguments but got 0.\n[line 2]");
    }

    #[test]
    fn test_undefined_variable() {
        let (_, kind, message) = run_err("print nope;");
        assert_eq!(kind, RuntimeErrorKind::UndefinedVariable);
        assert_eq!(message, "Undefined variable 'nope'.\n[line 1]");

        let (_, kind, _) = run_err("nope = 1;");
        assert_eq!(kind, RuntimeErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_display_forms() {
        let source = r#"
            fun f() {}
            class C { g { return 1; } }
            print f;
            print C;
            print C();
            print clock;
        "#;
        assert_eq!(run_ok(source), "<fn f>\nC\nC instance\n<native fn>\n");
    }

    #[test]
    fn test_clock_is_a_number() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    // ── classes ──────────────────────────────────────────────────────────

    #[test]
    fn test_fields_and_methods() {
        let source = r#"
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();
            var m = p.sum;
            print m();
        "#;
        assert_eq!(run_ok(source), "3\n12\n12\n");
    }

    #[test]
    fn test_getter_field_is_invoked_on_access() {
        let source = r#"
            class Circle {
                init(r) { this.r = r; }
                area { return this.r * 5; }
            }
            print Circle(1).area;
        "#;
        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn test_getter_field_runs_on_every_access() {
        let source = r#"
            class Counter {
                init() { this.n = 0; }
                tick { this.n = this.n + 1; return this.n; }
            }
            var c = Counter();
            print c.tick;
            print c.tick;
        "#;
        assert_eq!(run_ok(source), "1\n2\n");
    }

    #[test]
    fn test_field_shadows_method() {
        let source = r#"
            class S { m() { return 1; } }
            var s = S();
            print s.m();
            s.m = 2;
            print s.m;
        "#;
        assert_eq!(run_ok(source), "1\n2\n");
    }

    #[test]
    fn test_initializer_returns_instance() {
        let source = r#"
            class P {
                init(x) { this.x = x; if (x > 100) return; }
            }
            var p = P(3);
            print p.x;
            print p.init(4) == p;
            print p.x;
            print P(200).x;
        "#;
        assert_eq!(run_ok(source), "3\ntrue\n4\n200\n");
    }

    #[test]
    fn test_inheritance_and_super() {
        let source = r#"
            class A {
                greet() { return "A"; }
                name { return "a"; }
            }
            class B < A {
                greet() { return "B" + super.greet(); }
                name { return "b" + super.name; }
            }
            class C < B {}
            var c = C();
            print c.greet();
            print c.name;
        "#;
        assert_eq!(run_ok(source), "BA\nba\n");
    }

    #[test]
    fn test_super_binds_current_instance() {
        let source = r#"
            class A { who() { return this.tag; } }
            class B < A {
                init() { this.tag = "b"; }
                who() { return "sub:" + super.who(); }
            }
            print B().who();
        "#;
        assert_eq!(run_ok(source), "sub:b\n");
    }

    #[test]
    fn test_inherited_initializer() {
        let source = r#"
            class A { init(v) { this.v = v; } }
            class B < A {}
            print B(7).v;
        "#;
        assert_eq!(run_ok(source), "7\n");
    }

    #[test]
    fn test_invalid_superclass() {
        let (_, kind, message) = run_err("var NotAClass = 1;\nclass X < NotAClass {}");
        assert_eq!(kind, RuntimeErrorKind::InvalidSuperclass);
        assert_eq!(message, "Superclass must be a class.\n[line 2]");
    }

    #[test]
    fn test_property_errors() {
        let (_, kind, message) = run_err("class E {}\nE().nope;");
        assert_eq!(kind, RuntimeErrorKind::UndefinedProperty);
        assert_eq!(message, "Undefined property 'nope'.\n[line 2]");

        let (_, kind, _) = run_err("var n;\nn.x;");
        assert_eq!(kind, RuntimeErrorKind::InvalidPropertyTarget);

        let (_, kind, _) = run_err("(1).x;");
        assert_eq!(kind, RuntimeErrorKind::InvalidPropertyTarget);

        let (_, kind, message) = run_err("var s = \"str\";\ns.x = 1;");
        assert_eq!(kind, RuntimeErrorKind::InvalidPropertyTarget);
        assert_eq!(message, "Only instances have fields.\n[line 2]");
    }

    // ── static members ───────────────────────────────────────────────────

    #[test]
    fn test_static_members() {
        let source = r#"
            class M {
                static var base = 10;
                static var next = base + 1;
                static twice(n) { return n * 2 + base; }
                static label { return "M" + base; }
                static both() { return twice(1) + next; }
            }
            print M.twice(1);
            print M.label;
            print M.both();
        "#;
        assert_eq!(run_ok(source), "12\nM10\n23\n");
    }

    #[test]
    fn test_static_variables_are_not_class_properties() {
        let (_, kind, message) = run_err("class M { static var v = 1; }\nprint M.v;");
        assert_eq!(kind, RuntimeErrorKind::UndefinedProperty);
        assert_eq!(message, "Undefined property 'v'.\n[line 2]");
    }

    #[test]
    fn test_static_members_are_inherited() {
        let source = r#"
            class A {
                static var v = 1;
                static make() { return "made"; }
                static value() { return v; }
            }
            class B < A {}
            print B.make();
            print B.value();
        "#;
        assert_eq!(run_ok(source), "made\n1\n");
    }

    #[test]
    fn test_static_members_see_enclosing_locals() {
        let source = r#"
            {
                var k = "local";
                class A { static f() { return k; } }
                print A.f();
            }
            fun make() {
                class B { static f() { return B; } }
                return B.f();
            }
            print make();
        "#;
        assert_eq!(run_ok(source), "local\nB\n");
    }

    #[test]
    fn test_class_nested_in_instance_method() {
        let source = r#"
            class Outer {
                static var x = "outer-static";
                m(x) {
                    class Inner { static get() { return x; } }
                    return Inner.get();
                }
            }
            print Outer().m("method-param");
        "#;
        assert_eq!(run_ok(source), "method-param\n");

        // Outer's statics are not in scope inside an instance method.
        let source = r#"
            class Outer {
                static var x = "outer-static";
                m() {
                    class Inner { static get() { return x; } }
                    return Inner.get();
                }
            }
            print Outer().m();
        "#;
        let (_, kind, _) = run_err(source);
        assert_eq!(kind, RuntimeErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_class_nested_in_static_method() {
        let source = r#"
            class Outer {
                static var x = "outer-static";
                static m() {
                    class Inner { static get() { return x; } }
                    return Inner.get();
                }
            }
            print Outer.m();

            class Factory {
                static build(label) {
                    class Product { describe() { return label; } }
                    return Product();
                }
            }
            print Factory.build("widget").describe();
        "#;
        assert_eq!(run_ok(source), "outer-static\nwidget\n");
    }

    #[test]
    fn test_static_instance_boundary() {
        let source = "class M { static s() { return 1; } i() { return 2; } }\nM().s();";
        let (_, kind, _) = run_err(source);
        assert_eq!(kind, RuntimeErrorKind::StaticAccess);

        let source = "class M { static s() { return 1; } i() { return 2; } }\nM.i();";
        let (_, kind, _) = run_err(source);
        assert_eq!(kind, RuntimeErrorKind::StaticAccess);

        let (_, kind, _) = run_err("class M {}\nM.missing;");
        assert_eq!(kind, RuntimeErrorKind::UndefinedProperty);
    }

    // ── sessions ─────────────────────────────────────────────────────────

    #[test]
    fn test_static_errors_prevent_execution() {
        let (output, result) = run("print \"side effect\";\nreturn 1;\nbreak;");

        assert_eq!(output, "");
        match result {
            Err(e @ SessionError::Static(_)) => {
                assert_eq!(e.exit_code(), 65);
                assert_eq!(e.errors().len(), 2);
                assert!(e.errors().iter().all(|err| err.is_static()));
            }
            other => panic!("expected static errors, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_and_lexical_errors_are_collected() {
        let (_, result) = run("var a = @;\nprint ;");

        match result {
            Err(SessionError::Static(errors)) => {
                let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                assert_eq!(
                    rendered,
                    vec![
                        "[line 1] Error: Unexpected character: @",
                        "[line 1] Error at ';': Expected expression",
                        "[line 2] Error at ';': Expected expression",
                    ]
                );
            }
            other => panic!("expected static errors, got {:?}", other),
        }
    }

    #[test]
    fn test_runtime_error_keeps_earlier_effects() {
        let mut session = Session::new(Vec::new());

        session.run("var a = 1; a = 2;").expect("first line runs");
        let err = session.run("print nope;").expect_err("nope is undefined");
        assert_eq!(err.exit_code(), 70);

        session.run("print a;").expect("globals survive the error");

        let output = String::from_utf8(session.into_output()).expect("output is UTF-8");
        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_session_state_persists_between_runs() {
        let mut session = Session::new(Vec::new());

        session
            .run("class Greeter { hi(n) { return \"hi \" + n; } }")
            .expect("class declaration runs");
        session
            .run("fun wrap() { var g = Greeter(); return g.hi(\"there\"); }")
            .expect("function declaration runs");
        session.run("print wrap();").expect("call runs");

        assert_eq!(session.output().as_slice(), b"hi there\n");
    }
}
