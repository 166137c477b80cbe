#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    routes: usize,
    uri: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, routes: usize, uri: &'static str) -> Self {
        Self { name, group, routes, uri }
    }

    pub fn small(name: &'static str, uri: &'static str) -> Self {
        Self::new(name, TestGroup::Small, 10, uri)
    }

    pub fn normal(name: &'static str, uri: &'static str) -> Self {
        Self::new(name, TestGroup::Normal, 100, uri)
    }

    pub fn large(name: &'static str, uri: &'static str) -> Self {
        Self::new(name, TestGroup::Large, 1000, uri)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    /// Number of routes registered before the request runs.
    pub fn routes(&self) -> usize {
        self.routes
    }

    /// Route patterns of this case, `/api/v1/resource{n}/{id}` for each route.
    pub fn patterns(&self) -> impl Iterator<Item = String> {
        (0..self.routes).map(|n| format!("/api/v1/resource{n}/{{id}}"))
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}
