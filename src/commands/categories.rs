//! Category listing subcommand.

use crate::color::ColorScheme;
use crate::taiga::{CATEGORY_MAP, Shape};

/// Print the fixed category table: name, query template, required fields,
/// and result shape.
pub(crate) fn handle_categories_command(colors: &ColorScheme) {
  println!("{}\n", colors.emphasis("Known categories"));

  for spec in CATEGORY_MAP {
    let shape = match spec.shape {
      Shape::Dict => "single object",
      Shape::List => "record list",
    };

    println!("{} {}", colors.success(spec.name), colors.dimmed(format!("({shape})")));
    println!("  {}: {}", colors.emphasis("query"), colors.code(spec.template));
    println!("  {}: {}", colors.emphasis("fields"), spec.fields.join(", "));
  }
}
