


#[cfg(test)]
mod test_fluid_bus;
