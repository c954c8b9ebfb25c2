//! Test harness for the integration suites
//!
//! Named test cases with collected results and a printed summary, plus a
//! deterministic xorshift generator so jittered scenarios replay exactly.

/// Outcome of one named test case
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: &'static str,
    pub passed: bool,
    pub error_message: Option<String>,
}

/// Collects named test-case results within one `#[test]` function
pub struct TestHarness {
    results: Vec<TestResult>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Runs a single named case and records its outcome
    pub fn run_test<F>(&mut self, name: &'static str, test_fn: F)
    where
        F: FnOnce() -> Result<(), String>,
    {
        let result = test_fn();
        self.results.push(TestResult {
            name,
            passed: result.is_ok(),
            error_message: result.err(),
        });
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn print_summary(&self) {
        let total = self.results.len();
        let passed = self.results.iter().filter(|r| r.passed).count();

        println!("\nTest Results:");
        println!("============");
        println!("Total:  {total}");
        println!("Passed: {passed}");
        println!("Failed: {}", total - passed);

        for result in self.results.iter().filter(|r| !r.passed) {
            println!("  FAILED {}", result.name);
            if let Some(msg) = &result.error_message {
                println!("    {msg}");
            }
        }
    }
}

/// Deterministic xorshift generator for scenario jitter
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    pub fn gen_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}
