use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "neo.pest"]
pub struct NeoParser;
