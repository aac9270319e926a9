#![allow(
    clippy::string_slice,
    clippy::tests_outside_test_module,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "benchmark"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use handlebars::Handlebars;

mod utils;

// Handlebars has no arithmetic, so the doubled value is left out.
const TEMPLATE: &str = "Profile of {{user.name}} ({{user.age}}): \
{{#if user.active}}active{{else}}inactive{{/if}}. \
First item {{items.[0].name}} is worth {{items.[0].value}}. \
Access: {{#if has_access}}{{#if show_details}}full{{else}}limited{{/if}}{{else}}limited{{/if}}.";

fn handlebars_benchmark(c: &mut Criterion) {
    // Create the Handlebars registry
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string("profile", TEMPLATE)
        .unwrap();

    // Generate 100 random contexts
    let contexts = utils::generate_random_contexts(100);

    // Print binary size information
    utils::print_binary_size();

    // Setup benchmark group
    let mut group = c.benchmark_group("Template Rendering");
    group.sample_size(50);

    group.bench_function("handlebars_render", |b| {
        b.iter(|| {
            for context in &contexts {
                black_box(handlebars.render("profile", context).unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, handlebars_benchmark);
criterion_main!(benches);
