// Test modules for all components
pub mod mock_approximator;
pub mod test_trainer;
