pub mod plugins;

#[cfg(test)]
mod tests;
