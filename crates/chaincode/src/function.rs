//! The catalog of invocable functions.

use std::fmt;

/// A function exposed to ledger clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `storeModel(purpose, modelData)`
    StoreModel,
    /// `getModelInfo(purpose)`
    GetModelInfo,
    /// `storeTest(testId, payload [, featureRow])`
    StoreTest,
    /// `updateTest(testId, payload)`
    UpdateTest,
    /// `queryTest(testId)`
    QueryTest,
    /// `getAllTests()`
    GetAllTests,
    /// `storeImage(imageId, parentId, hashHex)`
    StoreImage,
    /// `getImage(imageId)`
    GetImage,
    /// `imageExists(imageId)`
    ImageExists,
    /// `getImagesByParent(parentId)`
    GetImagesByParent,
}

impl Function {
    /// Every function, in catalog order.
    pub const ALL: [Function; 10] = [
        Self::StoreModel,
        Self::GetModelInfo,
        Self::StoreTest,
        Self::UpdateTest,
        Self::QueryTest,
        Self::GetAllTests,
        Self::StoreImage,
        Self::GetImage,
        Self::ImageExists,
        Self::GetImagesByParent,
    ];

    /// Name clients invoke the function by.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StoreModel => "storeModel",
            Self::GetModelInfo => "getModelInfo",
            Self::StoreTest => "storeTest",
            Self::UpdateTest => "updateTest",
            Self::QueryTest => "queryTest",
            Self::GetAllTests => "getAllTests",
            Self::StoreImage => "storeImage",
            Self::GetImage => "getImage",
            Self::ImageExists => "imageExists",
            Self::GetImagesByParent => "getImagesByParent",
        }
    }

    /// Looks a function up by its exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Accepted argument counts, inclusive.
    pub const fn arity(self) -> (usize, usize) {
        match self {
            Self::GetAllTests => (0, 0),
            Self::GetModelInfo
            | Self::QueryTest
            | Self::GetImage
            | Self::ImageExists
            | Self::GetImagesByParent => (1, 1),
            Self::StoreModel | Self::UpdateTest => (2, 2),
            Self::StoreTest => (2, 3),
            Self::StoreImage => (3, 3),
        }
    }

    /// Whether the function only reads state.
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::GetModelInfo
                | Self::QueryTest
                | Self::GetAllTests
                | Self::GetImage
                | Self::ImageExists
                | Self::GetImagesByParent
        )
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
