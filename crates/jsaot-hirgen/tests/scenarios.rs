//! End-to-end lowering scenarios (§8), each built by hand-assembling the
//! AST a parser would otherwise produce — this crate ships no parser.

use jsaot_hirgen::ast::*;
use jsaot_hirgen::lower_program;

fn ident(name: &str) -> Expr {
    Expr::Identifier(Identifier::new(name))
}

fn num(n: f64) -> Expr {
    Expr::Literal(Literal::Number(n))
}

fn function(name: Option<&str>, params: Vec<&str>, body: Vec<Stmt>, is_generator: bool) -> FunctionExpr {
    FunctionExpr {
        name: name.map(String::from),
        params: params
            .into_iter()
            .map(|p| FunctionParam {
                pattern: Pattern::Identifier(Identifier::new(p)),
                default: None,
                is_rest: false,
                type_annotation: None,
            })
            .collect(),
        body,
        is_async: false,
        is_generator,
        return_type: None,
    }
}

fn let_decl(name: &str, init: Expr) -> Stmt {
    Stmt::VariableDeclaration {
        kind: VarKind::Let,
        declarations: vec![VariableDeclarator {
            pattern: Pattern::Identifier(Identifier::new(name)),
            init: Some(init),
        }],
    }
}

#[test]
fn closure_capture_records_environment_and_captured_names() {
    // function outer() { let x = 5; function inner() { return x; } return inner; }
    let inner = Stmt::FunctionDeclaration(FunctionDecl {
        name: "inner".into(),
        function: function(Some("inner"), vec![], vec![Stmt::Return(Some(ident("x")))], false),
    });
    let outer_body = vec![let_decl("x", num(5.0)), inner, Stmt::Return(Some(ident("inner")))];
    let program = Program {
        body: vec![Stmt::FunctionDeclaration(FunctionDecl {
            name: "outer".into(),
            function: function(Some("outer"), vec![], outer_body, false),
        })],
    };

    let (module, diagnostics) = lower_program("closure_capture", &program).unwrap();
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    assert_eq!(module.closure_captured_vars.get("inner"), Some(&vec!["x".to_string()]));
    assert!(module.closure_environments.contains_key("inner"));
    let inner_fn = module.get_function("inner").unwrap();
    assert_eq!(inner_fn.params.last().unwrap().name, "__env");
}

#[test]
fn class_inheritance_synthesizes_struct_and_virtual_methods() {
    // class Animal { constructor(name) { this.name = name; } speak() { return this.name; } }
    // class Dog extends Animal { speak() { return this.name; } }
    let animal_ctor = ClassMethod {
        name: "constructor".into(),
        kind: ClassMethodKind::Constructor,
        function: function(
            None,
            vec!["name"],
            vec![Stmt::Expression(Expr::Assignment {
                op: AssignOp::Assign,
                target: Box::new(Expr::Member {
                    object: Box::new(Expr::This),
                    property: MemberProperty::Static("name".into()),
                    optional: false,
                }),
                value: Box::new(ident("name")),
            })],
            false,
        ),
        is_static: false,
    };
    let speak = |body_uses_this: bool| ClassMethod {
        name: "speak".into(),
        kind: ClassMethodKind::Method,
        function: function(
            None,
            vec![],
            vec![Stmt::Return(Some(if body_uses_this {
                Expr::Member {
                    object: Box::new(Expr::This),
                    property: MemberProperty::Static("name".into()),
                    optional: false,
                }
            } else {
                num(0.0)
            }))],
            false,
        ),
        is_static: false,
    };

    let animal = ClassDecl {
        name: "Animal".into(),
        class: ClassExpr {
            name: Some("Animal".into()),
            super_class: None,
            body: ClassBody {
                properties: vec![],
                methods: vec![animal_ctor, speak(true)],
            },
        },
    };
    let dog = ClassDecl {
        name: "Dog".into(),
        class: ClassExpr {
            name: Some("Dog".into()),
            super_class: Some(Box::new(ident("Animal"))),
            body: ClassBody {
                properties: vec![],
                methods: vec![speak(true)],
            },
        },
    };

    let program = Program {
        body: vec![Stmt::ClassDeclaration(animal), Stmt::ClassDeclaration(dog)],
    };
    let (module, diagnostics) = lower_program("class_inheritance", &program).unwrap();
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");

    let dog_struct = module.get_struct("Dog").unwrap();
    assert!(dog_struct.field_index("name").is_some(), "Dog should inherit Animal's 'name' field");
    assert!(module.get_function("Animal_speak").is_some());
    assert!(module.get_function("Dog_speak").is_some());
    assert!(module.get_function("Dog_new").is_some());
}

#[test]
fn generator_lowers_to_an_explicit_dispatch_block() {
    // function* gen() { yield 1; yield 2; }
    let body = vec![
        Stmt::Expression(Expr::Yield {
            argument: Some(Box::new(num(1.0))),
            delegate: false,
        }),
        Stmt::Expression(Expr::Yield {
            argument: Some(Box::new(num(2.0))),
            delegate: false,
        }),
    ];
    let program = Program {
        body: vec![Stmt::FunctionDeclaration(FunctionDecl {
            name: "gen".into(),
            function: function(Some("gen"), vec![], body, true),
        })],
    };
    let (module, diagnostics) = lower_program("generator_dispatch", &program).unwrap();
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    let gen_fn = module.get_function("gen").unwrap();
    assert!(gen_fn.is_generator);
    // entry -> dispatch -> body_start -> resume(1) -> resume(2), at minimum.
    assert!(gen_fn.blocks.as_ref().unwrap().len() >= 4);
}

#[test]
fn short_circuit_and_branches_instead_of_always_evaluating_rhs() {
    // function f(a, b) { return a && b; }
    let body = vec![Stmt::Return(Some(Expr::Logical {
        op: LogicalOp::And,
        left: Box::new(ident("a")),
        right: Box::new(ident("b")),
    }))];
    let program = Program {
        body: vec![Stmt::FunctionDeclaration(FunctionDecl {
            name: "f".into(),
            function: function(Some("f"), vec!["a", "b"], body, false),
        })],
    };
    let (module, diagnostics) = lower_program("short_circuit", &program).unwrap();
    assert!(diagnostics.is_empty());
    let f = module.get_function("f").unwrap();
    // eval-right block + merge block, beyond just the entry.
    assert!(f.blocks.as_ref().unwrap().len() >= 3);
}

#[test]
fn for_of_over_a_generator_call_uses_the_iterator_protocol() {
    // function* gen() { yield 1; }
    // function consume() { for (const v of gen()) { } }
    let gen_decl = Stmt::FunctionDeclaration(FunctionDecl {
        name: "gen".into(),
        function: function(
            Some("gen"),
            vec![],
            vec![Stmt::Expression(Expr::Yield {
                argument: Some(Box::new(num(1.0))),
                delegate: false,
            })],
            true,
        ),
    });
    let consume_body = vec![Stmt::ForOf {
        left: ForHead::VariableDeclaration(VarKind::Const, Pattern::Identifier(Identifier::new("v"))),
        right: Expr::Call {
            callee: Box::new(ident("gen")),
            args: vec![],
            optional: false,
        },
        body: Box::new(Stmt::Block(vec![])),
        is_await: false,
        label: None,
    }];
    let consume_decl = Stmt::FunctionDeclaration(FunctionDecl {
        name: "consume".into(),
        function: function(Some("consume"), vec![], consume_body, false),
    });

    let program = Program {
        body: vec![gen_decl, consume_decl],
    };
    let (module, diagnostics) = lower_program("for_of_generator", &program).unwrap();
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    assert!(module.get_function("generator_next").is_some());
    assert!(module.get_function("iterator_result_done").is_some());
    assert!(module.get_function("iterator_result_value").is_some());
}

#[test]
fn break_inside_switch_exits_to_the_end_block_not_the_next_case() {
    // function f(x) { let y = 0; switch (x) { case 1: y = 1; break; default: y = 2; } return y; }
    let body = vec![
        let_decl("y", num(0.0)),
        Stmt::Switch {
            discriminant: ident("x"),
            cases: vec![
                SwitchCase {
                    test: Some(num(1.0)),
                    consequent: vec![
                        Stmt::Expression(Expr::Assignment {
                            op: AssignOp::Assign,
                            target: Box::new(ident("y")),
                            value: Box::new(num(1.0)),
                        }),
                        Stmt::Break(None),
                    ],
                },
                SwitchCase {
                    test: None,
                    consequent: vec![Stmt::Expression(Expr::Assignment {
                        op: AssignOp::Assign,
                        target: Box::new(ident("y")),
                        value: Box::new(num(2.0)),
                    })],
                },
            ],
        },
        Stmt::Return(Some(ident("y"))),
    ];
    let program = Program {
        body: vec![Stmt::FunctionDeclaration(FunctionDecl {
            name: "f".into(),
            function: function(Some("f"), vec!["x"], body, false),
        })],
    };
    let (_module, diagnostics) = lower_program("switch_break", &program).unwrap();
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
}

#[test]
fn break_outside_any_loop_is_a_non_fatal_diagnostic() {
    // §4.10/§7: break/continue with no enclosing loop is a semantic error,
    // not a fatal one — lowering still produces a module, with the problem
    // recorded as a diagnostic instead of aborting the whole pass.
    let program = Program {
        body: vec![Stmt::Break(None)],
    };
    let (_module, diagnostics) = lower_program("bad_break", &program).unwrap();
    assert!(!diagnostics.is_empty());
}

#[test]
fn super_call_with_no_parent_class_is_a_non_fatal_diagnostic() {
    let body = vec![Stmt::Expression(Expr::Call {
        callee: Box::new(Expr::Super),
        args: vec![],
        optional: false,
    })];
    let program = Program {
        body: vec![Stmt::ClassDeclaration(ClassDecl {
            name: "Orphan".to_string(),
            class: ClassExpr {
                name: Some("Orphan".to_string()),
                super_class: None,
                body: ClassBody {
                    properties: vec![],
                    methods: vec![ClassMethod {
                        name: "constructor".to_string(),
                        kind: ClassMethodKind::Constructor,
                        is_static: false,
                        function: function(None, vec![], body, false),
                    }],
                },
            },
        })],
    };
    let (_module, diagnostics) = lower_program("orphan_super", &program).unwrap();
    assert!(!diagnostics.is_empty());
}
